//! Construct-once wrapper around an expensive recognition capability.

use image::DynamicImage;
use once_cell::unsync::OnceCell;
use tracing::{info, warn};

use crate::error::RecognitionError;

use super::{RecognitionCapability, RecognitionMode};

/// Builds the wrapped capability on first use and reuses it afterwards.
///
/// Initialization runs at most once. A failed initialization is remembered
/// and every later call reports it as [`RecognitionError::Unavailable`].
/// The wrapper is `!Sync`: concurrent callers need one instance each.
pub struct LazyCapability<C, F> {
    cell: OnceCell<Result<C, String>>,
    init: F,
}

impl<C, F> LazyCapability<C, F>
where
    F: Fn() -> Result<C, RecognitionError>,
{
    /// Wrap an initializer without running it.
    pub fn new(init: F) -> Self {
        Self {
            cell: OnceCell::new(),
            init,
        }
    }

    /// Whether initialization has been attempted.
    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Get the capability, initializing it on the first call.
    pub fn get(&self) -> Result<&C, RecognitionError> {
        let slot = self.cell.get_or_init(|| match (self.init)() {
            Ok(capability) => {
                info!("Recognition capability initialized");
                Ok(capability)
            }
            Err(e) => {
                warn!("Recognition capability failed to initialize: {}", e);
                Err(e.to_string())
            }
        });

        slot.as_ref()
            .map_err(|msg| RecognitionError::Unavailable(msg.clone()))
    }
}

impl<C, F> RecognitionCapability for LazyCapability<C, F>
where
    C: RecognitionCapability,
    F: Fn() -> Result<C, RecognitionError>,
{
    fn recognize(
        &self,
        image: &DynamicImage,
        mode: RecognitionMode,
    ) -> Result<serde_json::Value, RecognitionError> {
        self.get()?.recognize(image, mode)
    }
}
