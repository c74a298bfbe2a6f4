//! Game output classification and exit outcome

use regex::Regex;
use std::process::ExitStatus;
use std::sync::LazyLock;
use std::time::Duration;

static GAME_LAUNCH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[.+\]: (?:MinecraftForge .+ Initialized|ModLauncher .+ starting: .+)$")
        .expect("game launch pattern")
});
static GAME_JOINED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[.+\]: Sound engine started").expect("game joined pattern"));

/// Minimum time the launch progress stays visible
pub const MIN_LINGER: Duration = Duration::from_millis(5000);

const MISSING_LAUNCHWRAPPER: &str =
    "Could not find or load main class net.minecraft.launchwrapper.Launch";
const OUT_OF_MEMORY: [&str; 2] = [
    "java.lang.OutOfMemoryError",
    "Could not reserve enough space for object heap",
];
const OPENGL_UNAVAILABLE: [&str; 2] = [
    "WGL: The driver does not appear to support OpenGL",
    "Pixel format not accelerated",
];

/// Something noteworthy the game printed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameSignal {
    /// Forge finished loading, the launcher can step aside
    LaunchComplete,
    /// The player entered the server world
    JoinedServer,
    MainMenu,
    MissingLaunchWrapper,
    OutOfMemory,
    OpenGlUnavailable,
}

/// Turns game output lines into signals
#[derive(Debug, Clone)]
pub struct OutputClassifier {
    server_joined: Option<Regex>,
}

impl OutputClassifier {
    /// An invalid server-joined pattern disables that signal
    pub fn new(server_joined_pattern: &str) -> Self {
        let server_joined = match Regex::new(server_joined_pattern) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::warn!(target: "landing", "Invalid server joined pattern: {}", e);
                None
            }
        };
        Self { server_joined }
    }

    pub fn classify_line(&self, line: &str) -> Option<GameSignal> {
        let line = line.trim();

        if GAME_LAUNCH.is_match(line) {
            Some(GameSignal::LaunchComplete)
        } else if self.server_joined.as_ref().is_some_and(|re| re.is_match(line)) {
            Some(GameSignal::JoinedServer)
        } else if GAME_JOINED.is_match(line) {
            Some(GameSignal::MainMenu)
        } else if line.contains(MISSING_LAUNCHWRAPPER) {
            Some(GameSignal::MissingLaunchWrapper)
        } else if OUT_OF_MEMORY.iter().any(|s| line.contains(s)) {
            Some(GameSignal::OutOfMemory)
        } else if OPENGL_UNAVAILABLE.iter().any(|s| line.contains(s)) {
            Some(GameSignal::OpenGlUnavailable)
        } else {
            None
        }
    }
}

/// How long to keep the progress view once loading completed
pub fn linger_remaining(elapsed: Duration) -> Duration {
    MIN_LINGER.saturating_sub(elapsed)
}

/// Flags gathered while the game ran
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunFlags {
    /// The mods folder was modified at runtime
    pub tampered: bool,
    pub out_of_memory: bool,
    pub opengl_unavailable: bool,
    pub missing_launchwrapper: bool,
}

impl RunFlags {
    pub fn record(&mut self, signal: GameSignal) {
        match signal {
            GameSignal::OutOfMemory => self.out_of_memory = true,
            GameSignal::OpenGlUnavailable => self.opengl_unavailable = true,
            GameSignal::MissingLaunchWrapper => self.missing_launchwrapper = true,
            _ => {}
        }
    }
}

/// Why the game stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOutcome {
    Shutdown,
    /// Killed by the launcher after a mod file changed
    Tampered,
    OutOfMemory,
    OpenGlUnavailable,
    MissingLaunchWrapper,
    Crashed,
}

impl GameOutcome {
    pub fn classify(status: ExitStatus, flags: RunFlags) -> Self {
        if flags.tampered {
            GameOutcome::Tampered
        } else if flags.out_of_memory {
            GameOutcome::OutOfMemory
        } else if flags.opengl_unavailable {
            GameOutcome::OpenGlUnavailable
        } else if flags.missing_launchwrapper {
            GameOutcome::MissingLaunchWrapper
        } else if status.success() {
            GameOutcome::Shutdown
        } else {
            GameOutcome::Crashed
        }
    }

    /// Failure title and description, `None` for a clean shutdown
    ///
    /// Crashes and a missing LaunchWrapper also get an error report, appended
    /// by the caller.
    pub fn failure(self) -> Option<(&'static str, &'static str)> {
        match self {
            GameOutcome::Shutdown => None,
            GameOutcome::Tampered => Some((
                "Runtime error",
                "A runtime error has occured, most likely due to a file edit.",
            )),
            GameOutcome::OutOfMemory => Some((
                "Out of memory",
                "Failed to allocate enough memory. Try lowering the amount of RAM allocated to Minecraft or close some RAM hungry programs that are running.",
            )),
            GameOutcome::OpenGlUnavailable => Some((
                "Video driver unavailable",
                "WGL: The driver does not appear to support OpenGL\n\nPlease try to update your graphics drivers, for more information\nplease refer to https://aka.ms/mcdriver/",
            )),
            GameOutcome::MissingLaunchWrapper => Some((
                "Error During Launch",
                "The main file, LaunchWrapper, failed to download properly. As a result, the game cannot launch.\n\nTo fix this issue, temporarily turn off your antivirus software and launch the game again.",
            )),
            GameOutcome::Crashed => Some(("Game crashed", "")),
        }
    }

    pub fn needs_report(self) -> bool {
        matches!(
            self,
            GameOutcome::Crashed | GameOutcome::MissingLaunchWrapper
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LaunchConfig;

    fn classifier() -> OutputClassifier {
        OutputClassifier::new(&LaunchConfig::default().server_joined_pattern)
    }

    #[test]
    fn test_classify_lines() {
        let c = classifier();
        assert_eq!(
            c.classify_line("[12:00:01] [main/INFO]: ModLauncher 8.0.9+86+master.3cf110c starting: java version 1.8.0_312\n"),
            Some(GameSignal::LaunchComplete)
        );
        assert_eq!(
            c.classify_line("[12:00:01] [main/INFO]: MinecraftForge v14.23.5.2855 Initialized"),
            Some(GameSignal::LaunchComplete)
        );
        assert_eq!(
            c.classify_line("[12:01:00] [Render thread/INFO]: [CHAT] [+] Steve_01 has entered Ardonia"),
            Some(GameSignal::JoinedServer)
        );
        assert_eq!(
            c.classify_line("[12:00:30] [Sound Library Loader/INFO]: Sound engine started"),
            Some(GameSignal::MainMenu)
        );
        assert_eq!(
            c.classify_line("Error: Could not find or load main class net.minecraft.launchwrapper.Launch"),
            Some(GameSignal::MissingLaunchWrapper)
        );
        assert_eq!(
            c.classify_line("Exception in thread \"main\" java.lang.OutOfMemoryError: Java heap space"),
            Some(GameSignal::OutOfMemory)
        );
        assert_eq!(c.classify_line("[12:00:02] [main/INFO]: Loading"), None);
    }

    #[test]
    fn test_invalid_join_pattern_is_ignored() {
        let c = OutputClassifier::new("([unclosed");
        assert_eq!(
            c.classify_line("[x]: [CHAT] [+] Steve has entered Ardonia"),
            None
        );
    }

    #[test]
    fn test_linger_remaining() {
        assert_eq!(linger_remaining(Duration::from_secs(2)), Duration::from_secs(3));
        assert_eq!(linger_remaining(Duration::from_secs(8)), Duration::ZERO);
    }

    #[cfg(unix)]
    #[test]
    fn test_outcome_classification() {
        use std::os::unix::process::ExitStatusExt;

        let ok = ExitStatus::from_raw(0);
        let failed = ExitStatus::from_raw(1 << 8);

        assert_eq!(GameOutcome::classify(ok, RunFlags::default()), GameOutcome::Shutdown);
        assert_eq!(GameOutcome::classify(failed, RunFlags::default()), GameOutcome::Crashed);

        let mut flags = RunFlags::default();
        flags.record(GameSignal::OutOfMemory);
        assert_eq!(GameOutcome::classify(failed, flags), GameOutcome::OutOfMemory);

        flags.tampered = true;
        assert_eq!(GameOutcome::classify(failed, flags), GameOutcome::Tampered);
        assert_eq!(GameOutcome::Tampered.failure().unwrap().0, "Runtime error");
        assert!(!GameOutcome::Tampered.needs_report());
        assert!(GameOutcome::Crashed.needs_report());
        assert!(GameOutcome::Shutdown.failure().is_none());
    }
}
