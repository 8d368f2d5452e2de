use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::diagnostic::Diagnostic;
use crate::span::Span;

/// Program-level settings used when rendering a descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderConfig {
    /// Name of the generated entry point.
    pub entry_point: String,
    /// `[numthreads(x, y, z)]`.
    pub thread_group: [u32; 3],
    /// Element count declared for each `ConstantBuffer<T>` array.
    pub constant_buffer_capacity: u32,
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self {
            entry_point: "CSMain".to_string(),
            thread_group: [64, 1, 1],
            constant_buffer_capacity: 1024,
        }
    }
}

/// Parse `[x, y, z]` with one to three entries; missing entries are 1.
fn parse_thread_group(s: &str) -> Option<[u32; 3]> {
    let s = s.trim();
    let inner = s.strip_prefix('[')?.strip_suffix(']')?;
    let mut group = [1u32; 3];
    let mut count = 0;
    for part in inner.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        if count == 3 {
            return None;
        }
        group[count] = part.parse().ok().filter(|&n| n > 0)?;
        count += 1;
    }
    (count > 0).then_some(group)
}

fn invalid(path: &Path, line: usize, msg: String) -> Diagnostic {
    Diagnostic::error(
        format!("{}:{}: {}", path.display(), line + 1, msg),
        Span::dummy(),
    )
}

impl ShaderConfig {
    pub fn entry_point(mut self, name: impl Into<String>) -> Self {
        self.entry_point = name.into();
        self
    }

    pub fn thread_group(mut self, x: u32, y: u32, z: u32) -> Self {
        self.thread_group = [x, y, z];
        self
    }

    pub fn constant_buffer_capacity(mut self, capacity: u32) -> Self {
        self.constant_buffer_capacity = capacity;
        self
    }

    /// Load the `[shader]` section of a TOML file. Keys that are absent keep
    /// their defaults; other sections are ignored.
    pub fn load(path: &Path) -> Result<ShaderConfig, Diagnostic> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Diagnostic::error(
                format!("cannot read '{}': {}", path.display(), e),
                Span::dummy(),
            )
        })?;

        let mut config = ShaderConfig::default();
        let mut section = String::new();

        for (n, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.starts_with('#') || trimmed.is_empty() {
                continue;
            }
            if trimmed.starts_with('[') && trimmed.ends_with(']') && !trimmed.contains('=') {
                section = trimmed[1..trimmed.len() - 1].trim().to_string();
                continue;
            }
            if section != "shader" {
                continue;
            }
            let Some((key, value)) = trimmed.split_once('=') else {
                return Err(invalid(path, n, format!("expected `key = value`, found `{}`", trimmed)));
            };
            let key = key.trim().trim_matches('"');
            let value = value.trim();
            match key {
                "entry_point" => {
                    let name = value.trim_matches('"');
                    if name.is_empty() {
                        return Err(invalid(path, n, "`entry_point` cannot be empty".to_string()));
                    }
                    config.entry_point = name.to_string();
                }
                "thread_group" => {
                    config.thread_group = parse_thread_group(value).ok_or_else(|| {
                        invalid(
                            path,
                            n,
                            format!("`thread_group` must be 1 to 3 positive integers, found `{}`", value),
                        )
                    })?;
                }
                "constant_buffer_capacity" => {
                    config.constant_buffer_capacity = value
                        .parse()
                        .ok()
                        .filter(|&c| c > 0)
                        .ok_or_else(|| {
                            invalid(
                                path,
                                n,
                                format!("`constant_buffer_capacity` must be a positive integer, found `{}`", value),
                            )
                        })?;
                }
                _ => {}
            }
        }

        Ok(config)
    }

    /// Look for `shader.toml` in `start_dir` or its ancestors.
    pub fn find(start_dir: &Path) -> Option<PathBuf> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join("shader.toml");
            if candidate.exists() {
                return Some(candidate);
            }
            if !dir.pop() {
                return None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shader.toml");
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_defaults() {
        let config = ShaderConfig::default();
        assert_eq!(config.entry_point, "CSMain");
        assert_eq!(config.thread_group, [64, 1, 1]);
        assert_eq!(config.constant_buffer_capacity, 1024);
    }

    #[test]
    fn test_builder() {
        let config = ShaderConfig::default()
            .entry_point("Blur")
            .thread_group(8, 8, 1)
            .constant_buffer_capacity(16);
        assert_eq!(config.entry_point, "Blur");
        assert_eq!(config.thread_group, [8, 8, 1]);
        assert_eq!(config.constant_buffer_capacity, 16);
    }

    #[test]
    fn test_load_shader_section() {
        let (_dir, path) = write(
            "[package]\nentry_point = \"Ignored\"\n\n# settings\n[shader]\nentry_point = \"Main\"\nthread_group = [16, 4]\n",
        );
        let config = ShaderConfig::load(&path).unwrap();
        assert_eq!(config.entry_point, "Main");
        assert_eq!(config.thread_group, [16, 4, 1]);
        assert_eq!(config.constant_buffer_capacity, 1024);
    }

    #[test]
    fn test_load_rejects_bad_values() {
        let (_dir, path) = write("[shader]\nthread_group = [0, 1, 1]\n");
        let err = ShaderConfig::load(&path).unwrap_err();
        assert!(err.message.contains("thread_group"));
        assert!(err.message.contains(":2:"));

        let (_dir, path) = write("[shader]\nconstant_buffer_capacity = lots\n");
        assert!(ShaderConfig::load(&path).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ShaderConfig::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(err.message.contains("cannot read"));
    }

    #[test]
    fn test_find_walks_up() {
        let (dir, path) = write("[shader]\n");
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        assert_eq!(ShaderConfig::find(&nested), Some(path));
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let config: ShaderConfig = serde_json::from_str(r#"{"entry_point":"K"}"#).unwrap();
        assert_eq!(config.entry_point, "K");
        assert_eq!(config.thread_group, [64, 1, 1]);
    }

    #[test]
    fn test_serde_round_trip_matches_loaded_file() {
        let (_dir, path) = write(
            "[shader]\nentry_point = \"Blur\"\nthread_group = [8, 8]\nconstant_buffer_capacity = 16\n",
        );
        let loaded = ShaderConfig::load(&path).unwrap();
        let json = serde_json::to_string(&loaded).unwrap();
        assert_eq!(
            json,
            r#"{"entry_point":"Blur","thread_group":[8,8,1],"constant_buffer_capacity":16}"#
        );
        let back: ShaderConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, loaded);
        assert_eq!(
            back,
            ShaderConfig::default()
                .entry_point("Blur")
                .thread_group(8, 8, 1)
                .constant_buffer_capacity(16)
        );
    }
}
