// Symbol visibility resolution for shared and static libraries
//
//  Copyright (C) 2014-2022 Ryan Specialty Group, LLC.
//
//  This file is part of SYMVIS.
//
//  This program is free software: you can redistribute it and/or modify
//  it under the terms of the GNU General Public License as published by
//  the Free Software Foundation, either version 3 of the License, or
//  (at your option) any later version.
//
//  This program is distributed in the hope that it will be useful,
//  but WITHOUT ANY WARRANTY; without even the implied warranty of
//  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//  GNU General Public License for more details.
//
//  You should have received a copy of the GNU General Public License
//  along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Resolution of symbol visibility annotations for C and C++ libraries.
//!
//! A library built as a shared object must mark the symbols it exposes;
//!   how it does so depends both on the platform and on whether the
//!   code being compiled _defines_ those symbols or merely _uses_ them.
//! On platforms with import libraries
//!   (Windows and Cygwin),
//!   the owner exports and its consumers import;
//!     elsewhere a single default-visibility attribute serves both.
//! A library linked statically needs no annotation at all.
//!
//! The system is organized as follows:
//!
//!   - [`module`] describes modules of a build and derives their macro
//!       names;
//!   - [`graph`] freezes those modules into a validated dependency graph;
//!   - [`platform`] describes the visibility mechanism of each platform;
//!   - [`resolve`] decides the visibility of a module from the
//!       perspective of a consumer;
//!   - [`emit`] renders those decisions as export headers; and
//!   - [`config`] reads build configurations for the `symvis` binary.
//!
//! Resolution is a pure function of the frozen graph,
//!   the platform profile,
//!   and the overrides for dual-use modules.

// We build docs for private items.
#![allow(rustdoc::private_intra_doc_links)]

#[macro_use]
extern crate static_assertions;

pub mod global;

pub mod config;
pub mod emit;
pub mod graph;
pub mod module;
pub mod platform;
pub mod resolve;

// Frozen state is queried concurrently by translation units of a build.
assert_impl_all!(graph::DepGraph: Send, Sync);
assert_impl_all!(resolve::LinkOverrides: Send, Sync);
assert_impl_all!(platform::PlatformProfile: Send, Sync);
assert_impl_all!(
    resolve::Resolver<'static, resolve::trace::VoidTrace>: Send, Sync
);
