pub mod companies;
pub mod parsing;
pub mod public;
pub mod tickers;

pub use companies::CompanyDirectory;
pub use parsing::{DocumentParser, LexicalParser, ParserChain, SchemaParser};
pub use public::{PublicDataSource, YahooEsgSource};
pub use tickers::Ticker;
