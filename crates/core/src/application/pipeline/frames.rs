// Frame directory helpers

use super::constants::{FRAME_EXTENSION, FRAME_PREFIX};
use std::io;
use std::path::{Path, PathBuf};

/// Numeric index of a frame file (`frame_00012.png` -> 12)
pub fn frame_index(path: &Path) -> Option<u32> {
    if path.extension()? != FRAME_EXTENSION {
        return None;
    }
    path.file_stem()?
        .to_str()?
        .strip_prefix(FRAME_PREFIX)?
        .parse()
        .ok()
}

/// Frame files in `dir`, in ascending frame order
///
/// Ordering is by parsed index, not by name, so sequences longer than the
/// zero padding still come out in playback order.
pub async fn list_frames(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut frames = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if let Some(index) = frame_index(&path) {
            frames.push((index, path));
        }
    }
    frames.sort_by_key(|(index, _)| *index);
    Ok(frames.into_iter().map(|(_, path)| path).collect())
}

/// Create an empty directory, discarding anything left at `dir`
pub async fn create_fresh_dir(dir: &Path) -> io::Result<()> {
    remove_dir_if_exists(dir).await?;
    tokio::fs::create_dir_all(dir).await
}

/// Remove a directory tree; a directory that is already gone counts as removed
pub async fn remove_dir_if_exists(dir: &Path) -> io::Result<()> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_frame_index() {
        assert_eq!(frame_index(Path::new("/x/frame_00001.png")), Some(1));
        assert_eq!(frame_index(Path::new("frame_123456.png")), Some(123456));
        assert_eq!(frame_index(Path::new("frame_00001.jpg")), None);
        assert_eq!(frame_index(Path::new("thumb_00001.png")), None);
        assert_eq!(frame_index(Path::new("frame_.png")), None);
    }

    #[tokio::test]
    async fn test_list_frames_sorted_numerically() {
        let dir = TempDir::new().unwrap();
        for name in [
            "frame_00010.png",
            "frame_00002.png",
            "frame_100000.png",
            "frame_00001.png",
            "notes.txt",
        ] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        let frames = list_frames(dir.path()).await.unwrap();
        let names: Vec<_> = frames
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(
            names,
            vec![
                "frame_00001.png",
                "frame_00002.png",
                "frame_00010.png",
                "frame_100000.png"
            ]
        );
    }

    #[tokio::test]
    async fn test_remove_dir_is_idempotent() {
        let root = TempDir::new().unwrap();
        let dir = root.path().join("frames").join("job-1");
        create_fresh_dir(&dir).await.unwrap();
        std::fs::write(dir.join("frame_00001.png"), b"x").unwrap();

        remove_dir_if_exists(&dir).await.unwrap();
        assert!(!dir.exists());
        remove_dir_if_exists(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_create_fresh_dir_discards_leftovers() {
        let root = TempDir::new().unwrap();
        let dir = root.path().join("job-1");
        create_fresh_dir(&dir).await.unwrap();
        std::fs::write(dir.join("frame_00001.png"), b"stale").unwrap();

        create_fresh_dir(&dir).await.unwrap();
        assert!(list_frames(&dir).await.unwrap().is_empty());
    }
}
