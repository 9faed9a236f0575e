pub mod encoding;
pub mod error;
pub mod media;
pub mod normalize;

pub use encoding::{decode_base64_image, encode_base64, mime_type_from_data_url};
pub use error::{MediaConnectorError, MultiModalError, MultiModalResult};
pub use media::{is_allowed_content_type, MediaConnector, MediaConnectorConfig, MediaSource};
pub use normalize::{EncodedImage, ImageNormalizer, NormalizerConfig};
