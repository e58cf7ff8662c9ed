// Global constants across the entirety of SYMVIS
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

//! System-wide static configuration.
//!
//! This module provides a system-wide configuration.
//! Subsystems should reference these values rather than defining their own
//!   and risk incompatibilities or maintenance issues as requirements
//!   change.
//!
//! By convention,
//!   import this entire module rather than individual members and reference
//!   them as `global::foo` to emphasize their nature and risk.

/// A size capable of representing every module of a build.
///
/// This is the index type of the dependency graph;
///   builds with more modules than this can represent are not
///   something we expect to ever see in practice.
pub type ModIdentSize = u32;

/// Suffix of the build flag defined while compiling a module's own
///   sources.
pub const OWNER_DEFINE_SUFFIX: &str = "EXPORTS";

/// Suffix of the build flag defined for static linkage of a module.
pub const STATIC_DEFINE_SUFFIX: &str = "STATIC";

/// Suffix of the default export token of a module.
pub const TOKEN_SUFFIX: &str = "PUBLIC";

/// Prefix used when a macro stem would otherwise begin with an
///   underscore,
///     which would produce an identifier reserved by C and C++.
pub const RESERVED_STEM_PREFIX: &str = "LIB";

/// Base file name (sans extension) of generated export headers.
pub const HEADER_BASENAME: &str = "export";

/// Extension of generated export headers.
pub const HEADER_EXT: &str = "h";
