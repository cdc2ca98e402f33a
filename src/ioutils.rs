//! Discovery of recording sessions on disk.
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use log::{debug, warn};

use crate::error::PixelsError;
use crate::metadata::SessionMetadata;

/// A session found in the raw data directory.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionEntry {
    pub name: String,
    pub metadata: Option<SessionMetadata>,
    pub data_dir: PathBuf,
}

/// Expand a leading `~` to the home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), std::env::var_os("HOME")) {
        (Ok(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => path.to_path_buf(),
    }
}

/// Parse the `YYMMDD` date at the start of a session name.
pub fn session_date(name: &str) -> Option<NaiveDate> {
    let prefix = name.get(..6)?;
    NaiveDate::parse_from_str(prefix, "%y%m%d").ok()
}

/// Read the training metadata of a mouse, a JSON list of sessions.
pub fn load_training_metadata(meta_dir: &Path, mouse_id: &str) -> Result<Vec<SessionMetadata>, PixelsError> {
    let path = meta_dir.join(format!("{}.json", mouse_id));
    let content = fs::read_to_string(&path)
        .map_err(|e| PixelsError::IOError(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&content)
        .map_err(|e| PixelsError::InvalidMetadata(format!("{}: {}", path.display(), e)))
}

/// Find the sessions of the given mice.
///
/// Sessions of a mouse are the entries of `<data_dir>/raw` whose name contains its ID,
/// sorted by name. With a metadata directory, only sessions whose `YYMMDD` name prefix
/// matches the date of a training metadata entry are kept, each with that entry.
pub fn get_sessions(
    mouse_ids: &[String],
    data_dir: &Path,
    meta_dir: Option<&Path>,
) -> Result<Vec<SessionEntry>, PixelsError> {
    let raw_dir = data_dir.join("raw");
    if !raw_dir.is_dir() {
        return Err(PixelsError::DirectoryNotFound(raw_dir));
    }
    let mut raw_names = vec![];
    for entry in fs::read_dir(&raw_dir)? {
        raw_names.push(entry?.file_name().to_string_lossy().into_owned());
    }
    raw_names.sort();

    let mut sessions = vec![];
    for mouse_id in mouse_ids {
        let mouse_sessions: Vec<&String> = raw_names
            .iter()
            .filter(|name| name.contains(mouse_id.as_str()))
            .collect();
        if mouse_sessions.is_empty() {
            warn!("Found no sessions for: {}", mouse_id);
            continue;
        }

        match meta_dir {
            None => sessions.extend(mouse_sessions.into_iter().map(|name| SessionEntry {
                name: name.clone(),
                metadata: None,
                data_dir: data_dir.to_path_buf(),
            })),
            Some(meta_dir) => {
                let training = load_training_metadata(meta_dir, mouse_id)?;
                for name in mouse_sessions {
                    let date = match session_date(name) {
                        Some(date) => date,
                        None => {
                            warn!("{}: session name does not start with a YYMMDD date", name);
                            continue;
                        }
                    };
                    let metadata = training.iter().find(|session| {
                        NaiveDate::parse_from_str(&session.date, "%Y-%m-%d").ok() == Some(date)
                    });
                    match metadata {
                        Some(metadata) => sessions.push(SessionEntry {
                            name: name.clone(),
                            metadata: Some(metadata.clone()),
                            data_dir: data_dir.to_path_buf(),
                        }),
                        None => debug!("{}: no training metadata for {}", name, date),
                    }
                }
            }
        }
    }
    Ok(sessions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data_dir(names: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for name in names {
            fs::create_dir_all(dir.path().join("raw").join(name)).unwrap();
        }
        dir
    }

    #[test]
    fn test_session_date() {
        assert_eq!(
            session_date("210304_HFR1"),
            NaiveDate::from_ymd_opt(2021, 3, 4)
        );
        assert_eq!(session_date("HFR1"), None);
        assert_eq!(session_date("2103"), None);
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home(Path::new("/data")), PathBuf::from("/data"));
        if let Some(home) = std::env::var_os("HOME") {
            assert_eq!(
                expand_home(Path::new("~/data")),
                PathBuf::from(home).join("data")
            );
        }
    }

    #[test]
    fn test_get_sessions_without_metadata() {
        let dir = data_dir(&["210305_HFR1", "210304_HFR1", "210304_HFR2"]);
        let ids = vec!["HFR1".to_string(), "HFR3".to_string(), "HFR2".to_string()];
        let sessions = get_sessions(&ids, dir.path(), None).unwrap();
        let names: Vec<&str> = sessions.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["210304_HFR1", "210305_HFR1", "210304_HFR2"]);
        assert!(sessions.iter().all(|s| s.metadata.is_none()));
    }

    #[test]
    fn test_get_sessions_with_metadata() {
        let dir = data_dir(&["210304_HFR1", "210305_HFR1"]);
        let meta = tempfile::tempdir().unwrap();
        fs::write(
            meta.path().join("HFR1.json"),
            r#"[{"date": "2021-03-05", "trials": []}, {"date": "2021-03-07", "trials": []}]"#,
        )
        .unwrap();

        let ids = vec!["HFR1".to_string()];
        let sessions = get_sessions(&ids, dir.path(), Some(meta.path())).unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].name, "210305_HFR1");
        assert_eq!(sessions[0].metadata.as_ref().unwrap().date, "2021-03-05");
    }

    #[test]
    fn test_get_sessions_errors() {
        let empty = tempfile::tempdir().unwrap();
        assert!(matches!(
            get_sessions(&[], empty.path(), None),
            Err(PixelsError::DirectoryNotFound(_))
        ));

        let dir = data_dir(&["210304_HFR1"]);
        let meta = tempfile::tempdir().unwrap();
        let ids = vec!["HFR1".to_string()];
        assert!(matches!(
            get_sessions(&ids, dir.path(), Some(meta.path())),
            Err(PixelsError::IOError(_))
        ));
        fs::write(meta.path().join("HFR1.json"), "{").unwrap();
        assert!(matches!(
            get_sessions(&ids, dir.path(), Some(meta.path())),
            Err(PixelsError::InvalidMetadata(_))
        ));
    }
}
