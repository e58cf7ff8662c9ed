// Module descriptors
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

//! Per-library metadata.
//!
//! A [`ModuleDescriptor`] describes a single library (or executable) of a
//!   build:
//!     its name,
//!     how it is linked ([`LinkMode`]),
//!     the modules it depends on,
//!     and the names of the macros that generated headers and compiler
//!       command lines use to refer to it.
//!
//! Macro names are data rather than code paths:
//!   every module gets an export token (e.g. `LIBFOO_PUBLIC`) and an owner
//!   build flag (e.g. `LIBFOO_EXPORTS`),
//!     derived from the module name by [`library_macro`] unless provided
//!     explicitly.

use crate::global;
use std::fmt::{self, Display};

/// How a module's build artifact is linked into its consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkMode {
    /// A static archive.
    Static,

    /// A shared object or DLL.
    Shared,

    /// Either of [`LinkMode::Static`] or [`LinkMode::Shared`],
    ///   chosen by the configuration of each consumer rather than by the
    ///   module definition.
    DualUse,
}

impl LinkMode {
    /// Parse the configuration spelling of a link mode.
    pub fn from_config(s: &str) -> Option<Self> {
        match s {
            "static" => Some(Self::Static),
            "shared" => Some(Self::Shared),
            "dual" => Some(Self::DualUse),
            _ => None,
        }
    }

    /// Whether this mode names a concrete kind of artifact.
    pub fn is_concrete(&self) -> bool {
        !matches!(self, Self::DualUse)
    }
}

impl Display for LinkMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Static => write!(f, "static"),
            Self::Shared => write!(f, "shared"),
            Self::DualUse => write!(f, "dual"),
        }
    }
}

/// Metadata for a single module of a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDescriptor {
    name: String,
    link_mode: LinkMode,
    dependencies: Vec<String>,
    own_export_define: String,
    static_define: String,
    token: String,
}

impl ModuleDescriptor {
    /// Describe a module with macro names derived from `name`.
    ///
    /// See [`library_macro`].
    pub fn new<S: Into<String>>(name: S, link_mode: LinkMode) -> Self {
        let name = name.into();
        let stem = macro_stem(&name);

        Self {
            own_export_define: format!(
                "{stem}_{}",
                global::OWNER_DEFINE_SUFFIX
            ),
            static_define: format!("{stem}_{}", global::STATIC_DEFINE_SUFFIX),
            token: format!("{stem}_{}", global::TOKEN_SUFFIX),
            name,
            link_mode,
            dependencies: Vec::new(),
        }
    }

    /// Add a direct dependency on the module named `dep`.
    ///
    /// Dependencies are kept in the order they are added so that output
    ///   is deterministic;
    ///     order has no effect on resolution.
    /// Repeated dependencies are ignored.
    pub fn with_dep<S: Into<String>>(mut self, dep: S) -> Self {
        self.add_dep(dep);
        self
    }

    /// Add each of `deps` in order.
    pub fn with_deps<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        deps.into_iter().for_each(|dep| self.add_dep(dep));
        self
    }

    /// Use `token` as the export macro in place of the derived name.
    pub fn with_token<S: Into<String>>(mut self, token: S) -> Self {
        self.token = token.into();
        self
    }

    /// Use `define` as the owner build flag in place of the derived name.
    pub fn with_own_export_define<S: Into<String>>(mut self, define: S) -> Self {
        self.own_export_define = define.into();
        self
    }

    pub fn add_dep<S: Into<String>>(&mut self, dep: S) {
        let dep = dep.into();

        if !self.dependencies.contains(&dep) {
            self.dependencies.push(dep);
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn link_mode(&self) -> LinkMode {
        self.link_mode
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// Build flag defined when compiling this module's own sources.
    pub fn own_export_define(&self) -> &str {
        &self.own_export_define
    }

    /// Build flag defined when this module is linked statically.
    pub fn static_define(&self) -> &str {
        &self.static_define
    }

    /// Export macro placed on this module's public declarations.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Identifier-safe stem of this module's name,
    ///   used for naming generated files.
    pub fn stem(&self) -> String {
        macro_stem(&self.name).to_lowercase()
    }
}

/// Which build flag [`library_macro`] should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacroKind {
    /// The flag defined while building a shared library's own sources.
    Exports,

    /// The flag defined while building or consuming a static library.
    Static,
}

/// Derive the build flag of kind `kind` for a library named `name`.
///
/// Every character outside of `[A-Za-z0-9_]` becomes an underscore,
///   a name beginning with a digit is prefixed by an underscore,
///   and a leading underscore is then replaced by `LIB_` so that the
///   result is never a reserved identifier.
///
/// ```
/// use symvis::module::{library_macro, MacroKind};
///
/// assert_eq!("LIBFOO_EXPORTS", library_macro("libfoo", MacroKind::Exports));
/// assert_eq!("DIR_LIBFOO_STATIC", library_macro("dir/libfoo", MacroKind::Static));
/// assert_eq!("LIB_1_LIBFOO_EXPORTS", library_macro("1/libfoo", MacroKind::Exports));
/// ```
pub fn library_macro(name: &str, kind: MacroKind) -> String {
    let suffix = match kind {
        MacroKind::Exports => global::OWNER_DEFINE_SUFFIX,
        MacroKind::Static => global::STATIC_DEFINE_SUFFIX,
    };

    format!("{}_{}", macro_stem(name), suffix)
}

fn macro_stem(name: &str) -> String {
    let mut stem: String = name
        .chars()
        .map(|c| match c {
            'A'..='Z' | '0'..='9' | '_' => c,
            'a'..='z' => c.to_ascii_uppercase(),
            _ => '_',
        })
        .collect();

    if stem.starts_with(|c: char| c.is_ascii_digit()) {
        stem.insert(0, '_');
    }

    match stem.strip_prefix('_') {
        Some(rest) => format!("{}_{}", global::RESERVED_STEM_PREFIX, rest),
        None => stem,
    }
}
