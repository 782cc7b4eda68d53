pub mod labels;
pub mod mapper;
pub mod normalize;

pub use labels::load_label_linkbase;
pub use mapper::{Category, DataType, IndicatorMapping, MappingTier, MetricMapper};
pub use normalize::{normalize_value, Normalized};
