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

//! Generates the gRPC client and server stubs for the four hook services.
//!
//! The messages are declared by hand with `prost` derives in `src/proto.rs`,
//! so only the service plumbing is generated and no `protoc` is required.

use tonic_build::manual::{Builder, Method, Service};

const PACKAGE: &str = "proto";

fn hook_service(name: &str, reply: &str) -> Service {
    Service::builder()
        .name(name)
        .package(PACKAGE)
        .method(
            Method::builder()
                .name("execute")
                .route_name("Execute")
                .input_type("crate::proto::Stack")
                .output_type(reply)
                .codec_path("tonic::codec::ProstCodec")
                .build(),
        )
        .build()
}

fn main() {
    let services = [
        hook_service("PreCreate", "crate::proto::Proceed"),
        hook_service("PostCreate", "crate::proto::Empty"),
        hook_service("PreDelete", "crate::proto::Proceed"),
        hook_service("PostDelete", "crate::proto::Empty"),
    ];

    Builder::new().compile(&services);
    println!("cargo:rerun-if-changed=build.rs");
}
