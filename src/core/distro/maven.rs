//! Maven coordinates used as module ids

use std::path::PathBuf;

/// `group:artifact:version[:classifier][@extension]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MavenId {
    pub group: String,
    pub artifact: String,
    pub version: String,
    pub classifier: Option<String>,
    pub extension: String,
}

impl MavenId {
    pub fn parse(id: &str) -> Option<Self> {
        let (coords, extension) = match id.split_once('@') {
            Some((coords, ext)) => (coords, ext.to_string()),
            None => (id, "jar".to_string()),
        };

        let parts: Vec<&str> = coords.split(':').collect();
        if parts.len() < 3 || parts.len() > 4 || parts.iter().any(|p| p.is_empty()) {
            return None;
        }

        Some(Self {
            group: parts[0].to_string(),
            artifact: parts[1].to_string(),
            version: parts[2].to_string(),
            classifier: parts.get(3).map(|c| c.to_string()),
            extension,
        })
    }

    /// Version-less key used to de-duplicate classpath entries
    pub fn versionless_key(&self) -> String {
        match &self.classifier {
            Some(c) => format!("{}:{}:{}", self.group, self.artifact, c),
            None => format!("{}:{}", self.group, self.artifact),
        }
    }

    /// Repository-relative path
    pub fn path(&self) -> PathBuf {
        let mut path = PathBuf::new();
        for segment in self.group.split('.') {
            path.push(segment);
        }
        path.push(&self.artifact);
        path.push(&self.version);
        path.push(self.file_name());
        path
    }

    pub fn file_name(&self) -> String {
        match &self.classifier {
            Some(c) => format!(
                "{}-{}-{}.{}",
                self.artifact, self.version, c, self.extension
            ),
            None => format!("{}-{}.{}", self.artifact, self.version, self.extension),
        }
    }
}
