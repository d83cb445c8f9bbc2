// Copyright (c) 2024-present
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! `read_gff`: the fixed 9-column GFF3 reader, a `GTF=false`
//! instantiation of the shared feature-table machinery.

pub type GffReader = crate::tabix::feature::FeatureReader<false>;
