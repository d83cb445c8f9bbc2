// Copyright (c) 2024-present
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! `read_gtf`: the fixed 9-column GTF reader, a `GTF=true`
//! instantiation of the shared feature-table machinery.

pub type GtfReader = crate::tabix::feature::FeatureReader<true>;
