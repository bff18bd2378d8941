//! Result kind returned by an agent handler, replacing exception-driven
//! control flow (Design Note: "Handlers return one of {ok, retry, fatal}
//! rather than raising").

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerResult {
    Ok,
    Retry,
    Fatal,
}
