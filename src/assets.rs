use std::path::{Path, PathBuf};

use log::debug;

/// Checked in this order; the first match wins.
pub const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "png", "jpeg", "gif"];

/// Find the image for a node: `<dir>/<node_id>.<ext>`. No image is fine.
pub fn find_image(dir: &Path, node_id: &str) -> Option<PathBuf> {
    let found = IMAGE_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{node_id}.{ext}")))
        .find(|path| path.is_file());
    debug!("Image lookup for {node_id}: {found:?}");
    found
}
