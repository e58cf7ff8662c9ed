// Export header emission
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

//! Rendering of [`ResolvedVisibility`] into C/C++ header fragments.
//!
//! This is intentionally dumb:
//!   every decision is made by the [`Resolver`],
//!   and this module only maps each [`ResolvedVisibility`] onto the
//!   corresponding token of the [`PlatformProfile`] (see [`render`]).
//!
//! A module's header defines its export token conditionally on its owner
//!   build flag,
//!
//! ```c
//! #if defined(LIBFOO_EXPORTS)
//! #  define LIBFOO_PUBLIC __declspec(dllexport)
//! #else
//! #  define LIBFOO_PUBLIC __declspec(dllimport)
//! #endif
//! ```
//!
//! unless both branches would be identical,
//!   in which case a single unconditional definition is produced.
//! That is always the case on platforms without distinct import and export
//!   keywords.
//!
//! Output is byte-for-byte identical for identical input.

use crate::{
    global,
    graph::DepGraph,
    module::ModuleDescriptor,
    platform::PlatformProfile,
    resolve::{
        trace::ResolverTrace, ResolutionContext, ResolveError,
        ResolveResult, ResolvedVisibility, Resolver, Role,
    },
};
use fxhash::FxHashMap;
use std::fmt::{self, Display};

/// Banner placed at the top of every generated header.
pub const BANNER: &str = "/* Generated by symvis; do not edit. */";

/// Token text for `vis` on `profile`.
pub fn render(vis: ResolvedVisibility, profile: &PlatformProfile) -> &str {
    match vis {
        ResolvedVisibility::Hidden => "",
        ResolvedVisibility::ExportExplicit => profile.export_keyword(),
        ResolvedVisibility::ImportExplicit => profile.import_keyword(),
        ResolvedVisibility::DefaultVisibilityAttribute => {
            profile.default_visibility_attribute()
        }
    }
}

/// Definition of a single module's export token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderFragment {
    token: String,
    owner_define: String,
    export: String,
    import: String,
}

impl HeaderFragment {
    /// Fragment for `target` under the build configuration of `consumer`.
    ///
    /// Both branches are resolved with the same consumer so that a
    ///   dual-use module's branches always agree on its link mode.
    pub fn resolve<T: ResolverTrace>(
        resolver: &Resolver<T>,
        consumer: &str,
        target: &ModuleDescriptor,
        profile: &PlatformProfile,
    ) -> ResolveResult<Self> {
        let name = target.name();

        let export = resolver.resolve(
            &ResolutionContext::new(consumer, name, Role::AsOwner),
            profile,
        )?;
        let import = resolver.resolve(
            &ResolutionContext::new(consumer, name, Role::AsConsumer),
            profile,
        )?;

        Ok(Self {
            token: target.token().into(),
            owner_define: target.own_export_define().into(),
            export: render(export, profile).into(),
            import: render(import, profile).into(),
        })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Whether the definition depends on the owner build flag.
    pub fn is_conditional(&self) -> bool {
        self.export != self.import
    }

    /// Include guard of the header containing this fragment.
    pub fn guard(&self) -> String {
        format!("INC_{}_H", self.token)
    }
}

impl Display for HeaderFragment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", BANNER)?;
        writeln!(f, "#ifndef {}", self.guard())?;
        writeln!(f, "#define {}", self.guard())?;
        writeln!(f)?;

        if self.is_conditional() {
            writeln!(f, "#if defined({})", self.owner_define)?;
            define(f, "#  define", &self.token, &self.export)?;
            writeln!(f, "#else")?;
            define(f, "#  define", &self.token, &self.import)?;
            writeln!(f, "#endif")?;
        } else {
            define(f, "#define", &self.token, &self.export)?;
        }

        writeln!(f)?;
        writeln!(f, "#endif")
    }
}

fn define(
    f: &mut fmt::Formatter,
    directive: &str,
    token: &str,
    value: &str,
) -> fmt::Result {
    if value.is_empty() {
        writeln!(f, "{} {}", directive, token)
    } else {
        writeln!(f, "{} {} {}", directive, token, value)
    }
}

/// A generated header file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    module: String,
    consumer: Option<String>,
    file_name: String,
    text: String,
}

impl Header {
    /// Module whose export token this header defines.
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Consumer this header is specific to,
    ///   if it is not shared by every consumer.
    pub fn consumer(&self) -> Option<&str> {
        self.consumer.as_deref()
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Module and,
    ///   if specific to one,
    ///   consumer of this header.
    fn describe(&self) -> String {
        match &self.consumer {
            Some(consumer) => format!("{} (for {})", self.module, consumer),
            None => self.module.clone(),
        }
    }
}

/// Produce the header of every module of the resolver's graph.
///
/// Modules are emitted in topological order.
/// Each module is resolved for its own build and for that of each of its
///   transitive dependents.
/// If every one of those renders identically,
///   a single `<stem>_export.h` is produced;
/// otherwise
///   (a dual-use module linked differently by different consumers)
///   one `<stem>_export.<consumer-stem>.h` is produced per context,
///     beginning with the module's own.
///
/// Every context is resolved before anything is returned;
///   any failure fails the entire emission.
/// That includes two modules sharing an export token
///   ([`ResolveError::TokenCollision`])
///   or two headers sharing a file name
///   ([`ResolveError::FileNameCollision`]),
///     either of which would leave one module without its definition.
pub fn emit_all<T: ResolverTrace>(
    resolver: &Resolver<T>,
    profile: &PlatformProfile,
) -> ResolveResult<Vec<Header>> {
    let graph = resolver.graph();
    check_tokens(graph)?;
    let order: Vec<&ModuleDescriptor> = graph.topological_order().collect();

    let position: FxHashMap<&str, usize> = order
        .iter()
        .enumerate()
        .map(|(i, m)| (m.name(), i))
        .collect();

    let mut headers = Vec::with_capacity(order.len());

    for &module in &order {
        let mut contexts = graph.transitive_dependents(module.name())?;
        contexts.sort_by_key(|m| position.get(m.name()).copied());
        contexts.insert(0, module);

        let fragments = contexts
            .iter()
            .map(|consumer| {
                HeaderFragment::resolve(resolver, consumer.name(), module, profile)
                    .map(|frag| (*consumer, frag.to_string()))
            })
            .collect::<ResolveResult<Vec<_>>>()?;

        let uniform = fragments.windows(2).all(|pair| pair[0].1 == pair[1].1);

        if uniform {
            if let Some((_, text)) = fragments.into_iter().next() {
                headers.push(Header {
                    module: module.name().into(),
                    consumer: None,
                    file_name: header_file_name(module, None),
                    text,
                });
            }
        } else {
            headers.extend(fragments.into_iter().map(|(consumer, text)| {
                Header {
                    module: module.name().into(),
                    consumer: Some(consumer.name().into()),
                    file_name: header_file_name(module, Some(consumer)),
                    text,
                }
            }));
        }
    }

    check_file_names(&headers)?;

    Ok(headers)
}

/// Fail if any two modules share an export token.
fn check_tokens(graph: &DepGraph) -> ResolveResult<()> {
    let mut owners: FxHashMap<&str, &str> = FxHashMap::default();

    for module in graph.modules() {
        if let Some(first) = owners.insert(module.token(), module.name()) {
            return Err(ResolveError::TokenCollision {
                token: module.token().into(),
                first: first.into(),
                second: module.name().into(),
            });
        }
    }

    Ok(())
}

/// Fail if any two headers would be written to the same file.
fn check_file_names(headers: &[Header]) -> ResolveResult<()> {
    let mut seen: FxHashMap<&str, &Header> = FxHashMap::default();

    for header in headers {
        if let Some(first) = seen.insert(header.file_name(), header) {
            return Err(ResolveError::FileNameCollision {
                file_name: header.file_name().into(),
                first: first.describe(),
                second: header.describe(),
            });
        }
    }

    Ok(())
}

fn header_file_name(
    module: &ModuleDescriptor,
    consumer: Option<&ModuleDescriptor>,
) -> String {
    match consumer {
        None => format!(
            "{}_{}.{}",
            module.stem(),
            global::HEADER_BASENAME,
            global::HEADER_EXT,
        ),
        Some(consumer) => format!(
            "{}_{}.{}.{}",
            module.stem(),
            global::HEADER_BASENAME,
            consumer.stem(),
            global::HEADER_EXT,
        ),
    }
}
