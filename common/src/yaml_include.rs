use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use yaml_rust2::{Yaml, YamlEmitter, YamlLoader};

const MAX_INCLUDE_DEPTH: usize = 8;

/// Loads a YAML file, resolving `!include <relative path>` lines.
///
/// Included documents are merged first (in order), then the including file is
/// merged on top, so local keys override included ones.
pub fn load_yaml_with_includes(path: &Path) -> Result<Yaml, Box<dyn Error + Send + Sync>> {
    let yaml = process_includes_recursive(&path.to_path_buf(), 0)?;
    tracing::debug!(path = %path.display(), "Resolved config includes");
    Ok(yaml)
}

/// Same as [`load_yaml_with_includes`] but re-emits the merged document as text.
pub fn load_yaml_string_with_includes(path: &Path) -> Result<String, Box<dyn Error + Send + Sync>> {
    let yaml = load_yaml_with_includes(path)?;
    let mut out = String::new();
    {
        let mut emitter = YamlEmitter::new(&mut out);
        emitter.dump(&yaml)?;
    }
    Ok(out)
}

fn process_includes_recursive(
    path: &PathBuf,
    depth: usize,
) -> Result<Yaml, Box<dyn Error + Send + Sync>> {
    if depth > MAX_INCLUDE_DEPTH {
        return Err(format!("include depth exceeded at {}", path.display()).into());
    }

    let contents = fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
    let base_path = path.parent().unwrap_or(Path::new(""));

    let (includes, rest): (Vec<&str>, Vec<&str>) = contents
        .lines()
        .partition(|&line| line.trim().starts_with("!include"));

    let mut merged_includes: Option<Yaml> = None;
    for line in includes {
        let include_path = line.trim().trim_start_matches("!include").trim();
        let included = process_includes_recursive(&base_path.join(include_path), depth + 1)?;
        merged_includes = Some(match merged_includes {
            Some(acc) => merge_yaml(&acc, &included),
            None => included,
        });
    }

    let merged_rest = YamlLoader::load_from_str(&rest.join("\n"))?
        .into_iter()
        .reduce(|acc, doc| merge_yaml(&acc, &doc))
        .unwrap_or(Yaml::Hash(Default::default()));

    Ok(match merged_includes {
        Some(base) => merge_yaml(&base, &merged_rest),
        None => merged_rest,
    })
}

fn merge_yaml(base: &Yaml, override_yaml: &Yaml) -> Yaml {
    match (base, override_yaml) {
        (Yaml::Hash(base_hash), Yaml::Hash(override_hash)) => {
            let mut result = base_hash.clone();
            for (key, value) in override_hash {
                let merged = match base_hash.get(key) {
                    Some(base_value) => merge_yaml(base_value, value),
                    None => value.clone(),
                };
                result.insert(key.clone(), merged);
            }
            Yaml::Hash(result)
        }
        // An empty document must not wipe out included values.
        (base, Yaml::Null) | (base, Yaml::BadValue) => base.clone(),
        (_, override_value) => override_value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_keys_override_included_ones() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("base.yaml"),
            "api:\n  base_url: \"http://base\"\n  timeout_ms: 100\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("dev.yaml"),
            "!include base.yaml\napi:\n  base_url: \"http://dev\"\n",
        )
        .unwrap();

        let yaml = load_yaml_with_includes(&dir.path().join("dev.yaml")).unwrap();
        assert_eq!(yaml["api"]["base_url"].as_str(), Some("http://dev"));
        assert_eq!(yaml["api"]["timeout_ms"].as_i64(), Some(100));
    }

    #[test]
    fn include_only_file_keeps_included_values() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("base.yaml"), "log_level: debug\n").unwrap();
        fs::write(dir.path().join("dev.yaml"), "!include base.yaml\n").unwrap();

        let yaml = load_yaml_with_includes(&dir.path().join("dev.yaml")).unwrap();
        assert_eq!(yaml["log_level"].as_str(), Some("debug"));
    }

    #[test]
    fn missing_include_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("dev.yaml"), "!include nope.yaml\n").unwrap();
        assert!(load_yaml_with_includes(&dir.path().join("dev.yaml")).is_err());
    }
}
