//! Optional on-disk copies of delivered reports

use std::path::{Path, PathBuf};
use storeq_api::Reply;
use tracing::{debug, warn};

/// Write every attachment in `replies` under `dir`.
///
/// Best-effort: failures are logged and the replies are still delivered.
pub fn archive_attachments(dir: &Path, replies: &[Reply]) -> Vec<PathBuf> {
    let mut written = Vec::new();

    for attachment in replies.iter().filter_map(|r| r.attachment.as_ref()) {
        // Filenames are generated locally, but never let one escape the directory
        let Some(name) = Path::new(&attachment.filename).file_name() else {
            warn!(filename = %attachment.filename, "Refusing to archive report with no file name");
            continue;
        };
        let path = dir.join(name);

        if let Err(e) = std::fs::create_dir_all(dir) {
            warn!(dir = %dir.display(), error = %e, "Failed to create reports directory");
            return written;
        }

        match std::fs::write(&path, &attachment.content) {
            Ok(()) => {
                debug!(path = %path.display(), "Report archived");
                written.push(path);
            }
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to archive report"),
        }
    }

    written
}
