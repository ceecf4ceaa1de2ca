//! Content-type inference for uploaded objects.
//!
//! Covers what a built web application ships. Unknown extensions yield
//! `None` so the storage backend applies its own default.

/// Guess the content type of a key or path from its extension.
pub fn from_path(path: &str) -> Option<&'static str> {
    let file_name = match path.rsplit_once('/') {
        Some((_, name)) => name,
        None => path,
    };
    let (_, ext) = file_name.rsplit_once('.')?;
    from_extension(&ext.to_ascii_lowercase())
}

/// Content type for a lowercase extension without the leading dot.
pub fn from_extension(ext: &str) -> Option<&'static str> {
    let mime = match ext {
        // Text
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" | "mjs" | "cjs" => "application/javascript",
        "json" | "map" => "application/json",
        "webmanifest" => "application/manifest+json",
        "txt" => "text/plain",
        "xml" => "application/xml",
        "csv" => "text/csv",
        "md" => "text/markdown",

        // Feeds
        "rss" => "application/rss+xml",
        "atom" => "application/atom+xml",

        // Images
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "bmp" => "image/bmp",

        // Fonts
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "eot" => "application/vnd.ms-fontobject",

        // Media
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "mp4" => "video/mp4",
        "webm" => "video/webm",

        // Binary
        "pdf" => "application/pdf",
        "wasm" => "application/wasm",
        "zip" => "application/zip",
        "gz" => "application/gzip",

        _ => return None,
    };
    Some(mime)
}
