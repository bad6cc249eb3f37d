// Copyright 2025 AgentReplay (https://github.com/agentreplay)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Wire messages and generated gRPC stubs.
//!
//! Equivalent protobuf definition:
//!
//! ```proto
//! syntax = "proto3";
//! package proto;
//!
//! message Stack   { string name = 1; }
//! message Proceed { bool failed = 1; }
//! message Empty   {}
//!
//! service PreCreate  { rpc Execute(Stack) returns (Proceed); }
//! service PostCreate { rpc Execute(Stack) returns (Empty); }
//! service PreDelete  { rpc Execute(Stack) returns (Proceed); }
//! service PostDelete { rpc Execute(Stack) returns (Empty); }
//! ```

/// Request for every hook: the stack the operation concerns.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Stack {
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
}

/// Reply of the pre hooks. `failed = true` aborts the operation.
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct Proceed {
    #[prost(bool, tag = "1")]
    pub failed: bool,
}

/// Reply of the post hooks.
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct Empty {}

impl Stack {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[allow(clippy::all)]
#[allow(missing_docs)]
mod generated {
    include!(concat!(env!("OUT_DIR"), "/proto.PreCreate.rs"));
    include!(concat!(env!("OUT_DIR"), "/proto.PostCreate.rs"));
    include!(concat!(env!("OUT_DIR"), "/proto.PreDelete.rs"));
    include!(concat!(env!("OUT_DIR"), "/proto.PostDelete.rs"));
}

pub use generated::{
    post_create_client, post_create_server, post_delete_client, post_delete_server,
    pre_create_client, pre_create_server, pre_delete_client, pre_delete_server,
};

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn stack_name_survives_the_codec(name in any::<String>()) {
            let encoded = Stack::new(name.clone()).encode_to_vec();
            let decoded = Stack::decode(encoded.as_slice()).unwrap();
            prop_assert_eq!(decoded.name, name);
        }
    }

    #[test]
    fn test_proceed_default_is_proceed() {
        let decoded = Proceed::decode(&[][..]).unwrap();
        assert!(!decoded.failed);
    }

    #[test]
    fn test_empty_stack_name_encodes_to_nothing() {
        assert!(Stack::new("").encode_to_vec().is_empty());
    }
}
