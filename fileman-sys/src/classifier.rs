// SPDX-License-Identifier: GPL-3.0-only

use std::path::Path;

use fileman_types::MimeCategory;

pub fn classify_path(path: &Path) -> MimeCategory {
    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
        return MimeCategory::Other;
    };

    let ext = ext.to_ascii_lowercase();

    match ext.as_str() {
        "txt" | "pdf" | "doc" | "docx" | "odt" | "rtf" | "md" | "epub" | "xls" | "xlsx"
        | "ods" | "ppt" | "pptx" | "odp" | "csv" => MimeCategory::Documents,
        "jpg" | "jpeg" | "png" | "gif" | "bmp" | "webp" | "svg" | "tif" | "tiff" | "heic"
        | "avif" => MimeCategory::Images,
        "mp3" | "wav" | "flac" | "aac" | "ogg" | "m4a" | "opus" | "amr" | "mid" => {
            MimeCategory::Audio
        }
        "mp4" | "mkv" | "webm" | "mov" | "avi" | "3gp" | "m4v" => MimeCategory::Video,
        "zip" | "tar" | "gz" | "tgz" | "bz2" | "xz" | "7z" | "rar" | "zst" => {
            MimeCategory::Archives
        }
        "rs" | "c" | "h" | "cpp" | "py" | "js" | "ts" | "java" | "kt" | "go" | "sh" | "json"
        | "xml" | "toml" | "yaml" | "yml" | "html" | "css" => MimeCategory::Code,
        "apk" | "deb" | "rpm" | "appimage" | "flatpak" | "snap" | "jar" => MimeCategory::Apps,
        _ => MimeCategory::Other,
    }
}
