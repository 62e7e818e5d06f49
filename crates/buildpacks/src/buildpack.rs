// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

use crate::source_tree::SourceTree;
use crate::spec::{BuildSpec, GenerateOptions};

pub trait Buildpack: Send + Sync {
    fn name(&self) -> &'static str;

    /// `true` if this buildpack recognizes the source tree. Registry order
    /// decides ties; each `detect` only needs to answer for itself.
    fn detect(&self, tree: &dyn SourceTree) -> bool;

    fn generate(&self, tree: &dyn SourceTree, opts: &GenerateOptions) -> BuildSpec;
}

pub mod golang;
pub mod nodejs;
pub mod php;
pub mod python;
pub mod ruby;
pub mod rust_lang;
pub mod static_site;
