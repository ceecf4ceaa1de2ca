//! Turns an enumerated build tree into bucket object descriptions.

use std::collections::HashSet;

use skylift_core::{BuildMode, ObjectUpload};

use crate::content_type;
use crate::enumerate::{EnumerateError, FileSet, PRODUCTION_DIR, PUBLIC_DIR};
use crate::hash;

/// Bucket-root-relative key for a build-relative path.
///
/// Only the leading segment is stripped: `public/` or `.production/` for
/// SSR, the mode folder for SSG/SPA. A nested folder that happens to be
/// called `public` keeps its name.
pub fn object_key(mode: BuildMode, relative: &str) -> String {
    let prefixes: &[&str] = match mode {
        BuildMode::Ssr => &[PUBLIC_DIR, PRODUCTION_DIR],
        BuildMode::Ssg => &["ssg"],
        BuildMode::Spa => &["spa"],
    };
    for prefix in prefixes {
        if let Some(rest) = relative
            .strip_prefix(prefix)
            .and_then(|r| r.strip_prefix('/'))
        {
            return rest.to_owned();
        }
    }
    relative.to_owned()
}

/// Describe one upload per file in `files`.
///
/// When two files map to the same key (`public/client.js` next to
/// `.production/client.js`), the first in walk order wins, which puts the
/// compiled client bundle ahead of a stale copy in `public/`.
pub fn plan_uploads(files: &FileSet) -> Result<Vec<ObjectUpload>, EnumerateError> {
    let mode = files.mode();
    let mut seen = HashSet::new();
    let mut uploads = Vec::new();

    for file in files.iter() {
        let file = file?;
        let key = object_key(mode, &file.relative);
        if !seen.insert(key.clone()) {
            tracing::warn!(file = %file.relative, key = %key, "duplicate object key; skipping");
            continue;
        }
        uploads.push(ObjectUpload {
            fingerprint: hash::fingerprint(&file.relative),
            content_type: content_type::from_path(&key).map(str::to_owned),
            key,
            source: file.path,
        });
    }

    tracing::debug!(mode = %mode, count = uploads.len(), "uploads planned");
    Ok(uploads)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn ssg_strips_mode_folder() {
        assert_eq!(object_key(BuildMode::Ssg, "ssg/index.html"), "index.html");
        assert_eq!(
            object_key(BuildMode::Ssg, "ssg/about/index.html"),
            "about/index.html"
        );
    }

    #[test]
    fn ssr_strips_public_and_production() {
        assert_eq!(object_key(BuildMode::Ssr, "public/favicon.ico"), "favicon.ico");
        assert_eq!(object_key(BuildMode::Ssr, ".production/client.js"), "client.js");
    }

    #[test]
    fn nested_public_folder_is_kept() {
        assert_eq!(
            object_key(BuildMode::Ssg, "ssg/public/logo.png"),
            "public/logo.png"
        );
        assert_eq!(
            object_key(BuildMode::Ssr, "public/docs/public/a.txt"),
            "docs/public/a.txt"
        );
    }

    #[test]
    fn prefix_must_be_whole_segment() {
        assert_eq!(object_key(BuildMode::Spa, "spanish/index.html"), "spanish/index.html");
    }

    proptest! {
        #[test]
        fn static_keys_never_keep_mode_prefix(rest in "[a-z0-9]{1,8}(/[a-z0-9.]{1,8}){0,3}") {
            for mode in [BuildMode::Ssg, BuildMode::Spa] {
                let relative = format!("{}/{rest}", mode.as_str());
                let key = object_key(mode, &relative);
                prop_assert_eq!(&key, &rest);
            }
        }
    }
}
