//! What the launch flow shows to the player

use std::io::{BufRead, IsTerminal, Write};

/// Answer to the "no compatible Java" prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JavaPrompt {
    Install,
    /// The player installs Java on their own
    Manual,
    Dismiss,
}

/// Answer to the "Java is required" prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredPrompt {
    Understand,
    /// Scan the system again
    GoBack,
}

pub const NO_JAVA_TITLE: &str = "No Compatible<br>Java Installation Found";
pub const JAVA_REQUIRED_TITLE: &str = "Java is Required<br>to Launch";
pub const JAVA_REQUIRED_DESC: &str = "A valid x64 installation of Java 8 is required to launch.";

/// Body of the "no compatible Java" prompt
pub fn no_java_message(compatibility_mode: bool) -> String {
    let mut message = String::from(
        "In order to join Songs of War, you need a 64-bit installation of Java 8. Would you like us to install a copy? By installing, you accept Oracle's license agreement.",
    );
    if compatibility_mode {
        message.push_str(" Warning! You are in compatibility mode, you cannot install one manually.");
    }
    message
}

/// The launch area of the landing screen
pub trait LaunchView {
    fn set_launch_details(&mut self, details: &str);

    /// Progress bar; `label` is the percentage printed next to it
    fn set_launch_percentage(&mut self, value: f64, max: f64, label: Option<u32>);

    /// Download progress as reported by the worker, 0 to 100
    fn set_download_percentage(&mut self, percent: u32);

    /// Swap between the launch button and the progress area
    fn toggle_launch_area(&mut self, loading: bool);

    fn set_launch_enabled(&mut self, enabled: bool);

    /// Show a notice the player has to acknowledge
    fn show_launch_failure(&mut self, title: &str, desc: &str);

    fn prompt_java_install(&mut self, allow_manual: bool) -> JavaPrompt;

    fn prompt_java_required(&mut self) -> RequiredPrompt;
}

/// Terminal rendition of the landing screen
pub struct ConsoleView {
    interactive: bool,
    compatibility_mode: bool,
    details: String,
    last_percent: Option<u32>,
}

impl ConsoleView {
    pub fn new(compatibility_mode: bool) -> Self {
        Self {
            interactive: std::io::stdin().is_terminal(),
            compatibility_mode,
            details: String::new(),
            last_percent: None,
        }
    }

    /// Ask a numbered question; `None` on an empty answer or closed stdin
    fn ask(&self, question: &str, options: &[&str]) -> Option<usize> {
        println!("{}", question);
        for (i, option) in options.iter().enumerate() {
            println!("   [{}] {}", i + 1, option);
        }
        print!("> ");
        let _ = std::io::stdout().flush();

        let mut answer = String::new();
        std::io::stdin().lock().read_line(&mut answer).ok()?;
        let index = answer.trim().parse::<usize>().ok()?;
        (1..=options.len()).contains(&index).then(|| index - 1)
    }
}

fn plain(title: &str) -> String {
    title.replace("<br>", " ")
}

impl LaunchView for ConsoleView {
    fn set_launch_details(&mut self, details: &str) {
        if self.details != details {
            self.details = details.to_string();
            println!("   {}", details);
        }
    }

    fn set_launch_percentage(&mut self, _value: f64, _max: f64, label: Option<u32>) {
        let Some(percent) = label else {
            return;
        };
        if self.last_percent != Some(percent) && percent % 10 == 0 {
            println!("   [{:>3}%] {}", percent, self.details);
        }
        self.last_percent = Some(percent);
    }

    fn set_download_percentage(&mut self, percent: u32) {
        if self.last_percent != Some(percent) && percent % 10 == 0 {
            println!("   [{:>3}%] {}", percent, self.details);
        }
        self.last_percent = Some(percent);
    }

    fn toggle_launch_area(&mut self, loading: bool) {
        if !loading {
            self.details.clear();
            self.last_percent = None;
        }
    }

    fn set_launch_enabled(&mut self, enabled: bool) {
        tracing::debug!(target: "landing", "Launch button enabled: {}", enabled);
    }

    fn show_launch_failure(&mut self, title: &str, desc: &str) {
        println!();
        println!("❌ {}", plain(title));
        for line in desc.lines() {
            println!("   {}", line);
        }
    }

    fn prompt_java_install(&mut self, allow_manual: bool) -> JavaPrompt {
        let question = format!(
            "☕ {}\n   {}",
            plain(NO_JAVA_TITLE),
            no_java_message(self.compatibility_mode)
        );
        if !self.interactive {
            println!("{}", question);
            println!("   Installing Java (non-interactive session)");
            return JavaPrompt::Install;
        }

        let options: &[&str] = if allow_manual {
            &["Install Java", "Install Manually"]
        } else {
            &["Install Java"]
        };
        match self.ask(&question, options) {
            Some(0) => JavaPrompt::Install,
            Some(1) => JavaPrompt::Manual,
            _ => JavaPrompt::Dismiss,
        }
    }

    fn prompt_java_required(&mut self) -> RequiredPrompt {
        let question = format!("⚠️  {}\n   {}", plain(JAVA_REQUIRED_TITLE), JAVA_REQUIRED_DESC);
        if !self.interactive {
            println!("{}", question);
            return RequiredPrompt::Understand;
        }
        match self.ask(&question, &["I Understand", "Go Back"]) {
            Some(1) => RequiredPrompt::GoBack,
            _ => RequiredPrompt::Understand,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Everything a view was asked to do, in order
    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        Details(String),
        Percentage(f64, Option<u32>),
        Download(u32),
        Toggle(bool),
        Enabled(bool),
        Failure(String, String),
        JavaPrompt(bool),
        RequiredPrompt,
    }

    pub struct RecordingView {
        pub calls: Vec<Call>,
        pub java_answer: JavaPrompt,
        pub required_answer: RequiredPrompt,
    }

    impl RecordingView {
        pub fn new() -> Self {
            Self {
                calls: Vec::new(),
                java_answer: JavaPrompt::Install,
                required_answer: RequiredPrompt::Understand,
            }
        }

        pub fn details(&self) -> Vec<&str> {
            self.calls
                .iter()
                .filter_map(|c| match c {
                    Call::Details(d) => Some(d.as_str()),
                    _ => None,
                })
                .collect()
        }

        pub fn last_details(&self) -> Option<&str> {
            self.details().last().copied()
        }

        pub fn failure(&self) -> Option<(&str, &str)> {
            self.calls.iter().rev().find_map(|c| match c {
                Call::Failure(t, d) => Some((t.as_str(), d.as_str())),
                _ => None,
            })
        }
    }

    impl LaunchView for RecordingView {
        fn set_launch_details(&mut self, details: &str) {
            self.calls.push(Call::Details(details.to_string()));
        }

        fn set_launch_percentage(&mut self, value: f64, _max: f64, label: Option<u32>) {
            self.calls.push(Call::Percentage(value, label));
        }

        fn set_download_percentage(&mut self, percent: u32) {
            self.calls.push(Call::Download(percent));
        }

        fn toggle_launch_area(&mut self, loading: bool) {
            self.calls.push(Call::Toggle(loading));
        }

        fn set_launch_enabled(&mut self, enabled: bool) {
            self.calls.push(Call::Enabled(enabled));
        }

        fn show_launch_failure(&mut self, title: &str, desc: &str) {
            self.calls
                .push(Call::Failure(title.to_string(), desc.to_string()));
        }

        fn prompt_java_install(&mut self, allow_manual: bool) -> JavaPrompt {
            self.calls.push(Call::JavaPrompt(allow_manual));
            self.java_answer
        }

        fn prompt_java_required(&mut self) -> RequiredPrompt {
            self.calls.push(Call::RequiredPrompt);
            self.required_answer
        }
    }

    #[test]
    fn test_no_java_message() {
        assert!(no_java_message(true).contains("compatibility mode"));
        assert!(!no_java_message(false).contains("compatibility mode"));
    }
}
