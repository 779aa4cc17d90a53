//! Single staged image, whichever source it came from. Installing a new image
//! hands the displaced one back so its preview resource can be released
//! before the replacement is ever rendered.

use serde::{Deserialize, Serialize};

use crate::capabilities::media::PreviewHandle;
use crate::image_processing::ImageKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageSource {
    Camera,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedImage {
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
    pub kind: ImageKind,
    pub width: u32,
    pub height: u32,
    pub source: ImageSource,
    pub preview: Option<PreviewHandle>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImageArbiter {
    current: Option<StagedImage>,
}

impl ImageArbiter {
    pub fn current(&self) -> Option<&StagedImage> {
        self.current.as_ref()
    }

    pub fn has_image(&self) -> bool {
        self.current.is_some()
    }

    /// Stage a new image. Returns the displaced image's preview handle, which
    /// the caller must release in the same update.
    pub fn install(&mut self, image: StagedImage) -> Option<PreviewHandle> {
        let displaced = self.current.replace(image);
        displaced.and_then(|staged| staged.preview)
    }

    /// Drop the staged image, returning its preview handle for release.
    pub fn clear(&mut self) -> Option<PreviewHandle> {
        self.current.take().and_then(|staged| staged.preview)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn staged(id: &str, source: ImageSource, with_preview: bool) -> StagedImage {
        StagedImage {
            data: id.as_bytes().to_vec(),
            kind: ImageKind::Jpeg,
            width: 640,
            height: 480,
            source,
            preview: with_preview.then(|| PreviewHandle(format!("preview-{id}"))),
        }
    }

    #[test]
    fn install_displaces_previous_image() {
        let mut arbiter = ImageArbiter::default();
        assert_eq!(arbiter.install(staged("a", ImageSource::Camera, true)), None);

        let displaced = arbiter.install(staged("b", ImageSource::File, true));
        assert_eq!(displaced, Some(PreviewHandle("preview-a".into())));
        assert_eq!(arbiter.current().unwrap().data, b"b");
    }

    #[test]
    fn clear_returns_handle_and_empties() {
        let mut arbiter = ImageArbiter::default();
        arbiter.install(staged("a", ImageSource::File, true));

        assert_eq!(arbiter.clear(), Some(PreviewHandle("preview-a".into())));
        assert!(!arbiter.has_image());
        assert_eq!(arbiter.clear(), None);
    }

    #[test]
    fn images_without_previews_displace_silently() {
        let mut arbiter = ImageArbiter::default();
        arbiter.install(staged("a", ImageSource::Camera, false));
        assert_eq!(arbiter.install(staged("b", ImageSource::File, true)), None);
    }

    proptest! {
        // The staged image is always the most recently installed one, and
        // every displaced preview handle comes back exactly once.
        #[test]
        fn last_install_wins(ops in proptest::collection::vec(any::<bool>(), 1..30)) {
            let mut arbiter = ImageArbiter::default();
            let mut expected: Option<String> = None;
            let mut released = Vec::new();

            for (i, is_install) in ops.into_iter().enumerate() {
                if is_install {
                    let id = format!("img{i}");
                    if let Some(handle) = arbiter.install(staged(&id, ImageSource::File, true)) {
                        released.push(handle);
                    }
                    expected = Some(id);
                } else {
                    if let Some(handle) = arbiter.clear() {
                        released.push(handle);
                    }
                    expected = None;
                }

                prop_assert_eq!(
                    arbiter.current().map(|s| s.data.clone()),
                    expected.as_ref().map(|id| id.as_bytes().to_vec())
                );
            }

            let mut seen = released.clone();
            seen.sort_by(|a, b| a.0.cmp(&b.0));
            seen.dedup();
            prop_assert_eq!(seen.len(), released.len());
        }
    }
}
