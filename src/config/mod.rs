mod types;

pub use types::*;

use anyhow::{Context, Result};
use segmerge_av::normalize_path;
use std::path::Path;

/// Default locations searched when no config path is given
const DEFAULT_PATHS: &[&str] = &[
    "./segmerge.toml",
    "~/.config/segmerge/config.toml",
    "/etc/segmerge/config.toml",
];

/// Parse and validate configuration from TOML text
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content)?;
    validate_config(&config)?;
    Ok(config)
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    parse_config(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    for path_str in DEFAULT_PATHS {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.merge.output.as_os_str().is_empty() {
        anyhow::bail!("merge.output cannot be empty");
    }

    if !config.merge.use_temp_dir && config.merge.work_dir.as_os_str().is_empty() {
        anyhow::bail!("merge.work_dir cannot be empty unless merge.use_temp_dir is set");
    }

    // The work directory is removed after the run, taking the output with it
    if !config.merge.use_temp_dir {
        let work_dir = normalize_path(&config.merge.work_dir)?;
        if normalize_path(&config.merge.output)?.starts_with(&work_dir) {
            anyhow::bail!(
                "merge.output {:?} lies inside merge.work_dir {:?}",
                config.merge.output,
                config.merge.work_dir
            );
        }
    }

    if config.fetch.timeout_secs == 0 {
        anyhow::bail!("fetch.timeout_secs cannot be 0");
    }

    if config.tools.timeout_secs == 0 {
        anyhow::bail!("tools.timeout_secs cannot be 0");
    }

    if config.encode.crf > 51 {
        anyhow::bail!("encode.crf must be between 0 and 51, got {}", config.encode.crf);
    }

    if config.probe.concurrency == Some(0) {
        anyhow::bail!("probe.concurrency cannot be 0");
    }

    for warning in config_warnings(config) {
        tracing::warn!("{}", warning);
    }

    Ok(())
}

/// Non-fatal issues worth reporting
pub fn config_warnings(config: &Config) -> Vec<String> {
    let mut warnings = Vec::new();

    for (name, path) in [
        ("ffmpeg", &config.tools.ffmpeg_path),
        ("ffprobe", &config.tools.ffprobe_path),
    ] {
        if let Some(path) = path {
            if !path.exists() {
                warnings.push(format!("tools.{name}_path {:?} does not exist", path));
            }
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use segmerge_core::Taxonomy;
    use std::path::PathBuf;

    #[test]
    fn empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.merge.work_dir, PathBuf::from("./temp"));
        assert_eq!(config.merge.output, PathBuf::from("final_merged.mp4"));
        assert_eq!(config.merge.taxonomy, Taxonomy::Numbered);
        assert!(!config.merge.keep_intermediates);
        assert_eq!(config.fetch.timeout_secs, 30);
        assert_eq!(config.encode.video_codec, "libx264");
        assert_eq!(config.encode.crf, 23);
        assert_eq!(config.encode.audio_bitrate, "128k");
        assert_eq!(config.tools.timeout_secs, 600);
    }

    #[test]
    fn sections_override_defaults() {
        let config = parse_config(
            r#"
            [merge]
            work_dir = "/var/tmp/segmerge"
            output = "out.mkv"
            taxonomy = "binary"
            keep_intermediates = true

            [encode]
            video_codec = "libx265"
            crf = 28

            [probe]
            concurrency = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.merge.work_dir, PathBuf::from("/var/tmp/segmerge"));
        assert_eq!(config.merge.taxonomy, Taxonomy::Binary);
        assert!(config.merge.keep_intermediates);
        assert_eq!(config.encode.video_codec, "libx265");
        assert_eq!(config.encode.preset, "fast");
        assert_eq!(config.encode.crf, 28);
        assert_eq!(config.probe.concurrency, Some(2));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(parse_config("[encode]\ncrf = 60").is_err());
        assert!(parse_config("[fetch]\ntimeout_secs = 0").is_err());
        assert!(parse_config("[merge]\noutput = \"\"").is_err());
        assert!(parse_config("[probe]\nconcurrency = 0").is_err());
        assert!(parse_config("[merge]\ntaxonomy = \"flat\"").is_err());
    }

    #[test]
    fn rejects_output_inside_work_dir() {
        // Default work_dir is ./temp
        assert!(parse_config("[merge]\noutput = \"temp/final.mp4\"").is_err());
        assert!(parse_config("[merge]\noutput = \"./temp/../temp/final.mp4\"").is_err());
        assert!(parse_config("[merge]\noutput = \"temp.mp4\"").is_ok());

        let mut config = Config::default();
        config.merge.output = PathBuf::from("temp/final.mp4");
        config.merge.use_temp_dir = true;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn warns_about_missing_tool_paths() {
        let mut config = Config::default();
        config.tools.ffmpeg_path = Some(PathBuf::from("/nonexistent/ffmpeg"));
        let warnings = config_warnings(&config);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("ffmpeg_path"));
    }

    #[test]
    fn probe_workers_capped_by_segments() {
        let probe = ProbeConfig {
            concurrency: Some(8),
        };
        assert_eq!(probe.workers(3), 3);
        assert_eq!(probe.workers(20), 8);
        assert_eq!(probe.workers(0), 1);
    }

    #[test]
    fn load_missing_file_fails() {
        assert!(load_config(Path::new("/nonexistent/segmerge.toml")).is_err());
    }

    #[test]
    fn load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("segmerge.toml");
        std::fs::write(&path, "[merge]\noutput = \"joined.mp4\"\n").unwrap();
        let config = load_config_or_default(Some(&path)).unwrap();
        assert_eq!(config.merge.output, PathBuf::from("joined.mp4"));
    }
}
