mod article;
mod feed_source;
mod instrument;
mod settings;
mod subscription;

pub use article::*;
pub use feed_source::*;
pub use instrument::*;
pub use settings::*;
pub use subscription::*;
