use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[display("invalid configuration")]
    Config,
    #[display("cannot open the index database")]
    Database,
    #[display("cannot set up feed fetching")]
    Fetch,
    #[display("catalog request failed")]
    Catalog,
    #[display("cannot write output")]
    Output,
}
