//! Pool filters.
//!
//! Pool info calls take an ownership scope and an id range, plus trailing
//! arguments depending on the resource type. Every filter renders itself as
//! the positional argument list of the call.

use crate::error::{ClientError, Result};
use crate::transport::CallArg;

/// Ownership scope of a pool query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolWho {
    /// Resources belonging to the user's primary group.
    PrimaryGroup = -4,
    /// Resources owned by the caller.
    Mine = -3,
    /// Everything the caller can see.
    All = -2,
    /// Resources of the caller's groups.
    Group = -1,
}

/// Base pool filter: `[who, start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Filter {
    who: i64,
    start: i64,
    end: i64,
}

impl Filter {
    /// Scope "mine", whole id range.
    pub fn new() -> Self {
        Self {
            who: PoolWho::Mine as i64,
            start: -1,
            end: -1,
        }
    }

    /// Restrict the query to resources owned by user `uid`.
    /// Mutually exclusive with [`set_visibility`](Self::set_visibility).
    pub fn set_uid(&mut self, uid: i64) -> Result<&mut Self> {
        if uid < 0 {
            return Err(ClientError::InvalidArgument(format!(
                "filter uid must be positive, got {}",
                uid
            )));
        }
        self.who = uid;
        Ok(self)
    }

    pub fn set_visibility(&mut self, who: PoolWho) -> &mut Self {
        self.who = who as i64;
        self
    }

    /// Restrict to ids in `[start, end]`; `-1` leaves a bound open.
    pub fn set_range(&mut self, start: i64, end: i64) -> &mut Self {
        self.start = start;
        self.end = end;
        self
    }

    pub fn who(&self) -> i64 {
        self.who
    }

    pub fn to_args(&self) -> Vec<CallArg> {
        vec![
            CallArg::Int(self.who),
            CallArg::Int(self.start),
            CallArg::Int(self.end),
        ]
    }
}

impl Default for Filter {
    fn default() -> Self {
        Self::new()
    }
}

fn pair_filter(key: &str, value: &str) -> String {
    format!("{}=\"{}\"", key, value)
}

/// Filter with an extra `KEY="value"` template match: `[who, start, end, pair]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtendedFilter {
    pub filter: Filter,
    pair: String,
}

impl ExtendedFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_pair(&mut self, key: &str, value: &str) -> &mut Self {
        self.pair = pair_filter(key, value);
        self
    }

    pub fn pair(&self) -> &str {
        &self.pair
    }

    pub fn to_args(&self) -> Vec<CallArg> {
        let mut args = self.filter.to_args();
        args.push(CallArg::Str(self.pair.clone()));
        args
    }
}

/// VM pool filter: `[who, start, end, state]`. State `-1` means any state
/// except DONE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmFilter {
    pub filter: Filter,
    state: i64,
}

impl VmFilter {
    pub fn new() -> Self {
        Self {
            filter: Filter::new(),
            state: -1,
        }
    }

    pub fn set_state(&mut self, state: i64) -> &mut Self {
        self.state = state;
        self
    }

    pub fn to_args(&self) -> Vec<CallArg> {
        let mut args = self.filter.to_args();
        args.push(CallArg::Int(self.state));
        args
    }
}

impl Default for VmFilter {
    fn default() -> Self {
        Self::new()
    }
}

/// VM pool filter with a template match: `[who, start, end, state, pair]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmExtendedFilter {
    pub filter: Filter,
    state: i64,
    pair: String,
}

impl VmExtendedFilter {
    pub fn new() -> Self {
        Self {
            filter: Filter::new(),
            state: -1,
            pair: String::new(),
        }
    }

    pub fn set_state(&mut self, state: i64) -> &mut Self {
        self.state = state;
        self
    }

    pub fn set_pair(&mut self, key: &str, value: &str) -> &mut Self {
        self.pair = pair_filter(key, value);
        self
    }

    pub fn to_args(&self) -> Vec<CallArg> {
        let mut args = self.filter.to_args();
        args.push(CallArg::Int(self.state));
        args.push(CallArg::Str(self.pair.clone()));
        args
    }
}

impl Default for VmExtendedFilter {
    fn default() -> Self {
        Self::new()
    }
}

/// Document pool filter: `[who, start, end, type]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentFilter {
    pub filter: Filter,
    doc_type: i64,
}

impl DocumentFilter {
    pub fn new(doc_type: i64) -> Self {
        Self {
            filter: Filter::new(),
            doc_type,
        }
    }

    pub fn with_filter(filter: Filter, doc_type: i64) -> Self {
        Self { filter, doc_type }
    }

    pub fn to_args(&self) -> Vec<CallArg> {
        let mut args = self.filter.to_args();
        args.push(CallArg::Int(self.doc_type));
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;

    #[test]
    fn test_default_filter() {
        assert_eq!(Filter::new().to_args(), args![-3, -1, -1]);
        assert_eq!(VmFilter::new().to_args(), args![-3, -1, -1, -1]);
        assert_eq!(DocumentFilter::new(100).to_args(), args![-3, -1, -1, 100]);
    }

    #[test]
    fn test_set_uid() {
        let mut filter = Filter::new();
        assert!(matches!(
            filter.set_uid(-2),
            Err(ClientError::InvalidArgument(_))
        ));
        assert_eq!(filter.who(), -3);

        filter.set_uid(5).unwrap().set_range(10, 20);
        assert_eq!(filter.to_args(), args![5, 10, 20]);
    }

    #[test]
    fn test_extended_argument_order() {
        let mut filter = VmExtendedFilter::new();
        filter.set_state(3).set_pair("ROLE", "db");
        filter.filter.set_visibility(PoolWho::All);

        assert_eq!(filter.to_args(), args![-2, -1, -1, 3, "ROLE=\"db\""]);

        let mut ext = ExtendedFilter::new();
        ext.set_pair("LABEL", "prod");
        assert_eq!(ext.to_args(), args![-3, -1, -1, "LABEL=\"prod\""]);
    }
}
