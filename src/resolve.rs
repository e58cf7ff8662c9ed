// Symbol visibility resolution
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

//! Visibility resolution for module export tokens.
//!
//! Every module exposes an export token
//!   (e.g. `LIBFOO_PUBLIC`)
//!   that decorates its public declarations.
//! What that token must expand to depends on three things only:
//!
//!   - the link mode the module takes _for the build in question_;
//!   - whether the translation unit being compiled belongs to the module
//!       itself or to one of its consumers ([`Role`]); and
//!   - the visibility mechanism of the target platform
//!       ([`PlatformProfile`]).
//!
//! Decision Table
//! ==============
//! The first matching rule wins:
//!
//!   1. A module linked statically needs no decoration on any platform,
//!        since static linkage never crosses a dynamic symbol boundary;
//!        the result is [`ResolvedVisibility::Hidden`].
//!      A default-visibility attribute would be harmless for static
//!        archives on POSIX-style platforms,
//!        but it is never required and so is never produced.
//!   2. A shared module on a platform with distinct import and export
//!        keywords is [`ResolvedVisibility::ExportExplicit`] when compiling
//!        its own sources and [`ResolvedVisibility::ImportExplicit`]
//!        otherwise.
//!   3. A shared module on any other platform uses the single
//!        [`ResolvedVisibility::DefaultVisibilityAttribute`] for both roles.
//!   4. A [`LinkMode::DualUse`] module takes the mode selected for it by
//!        [`LinkOverrides`] for the consumer being compiled and re-enters
//!        the above rules.
//!      A missing override is an error;
//!        we never silently pick one.
//!
//! Visibility is therefore a property of a _build_,
//!   not of a module definition alone:
//!     the same dual-use module may resolve differently for two
//!     consumers in the same graph.
//!
//! Owner status does not pass through dependency chains.
//! Given `C -> B -> A`,
//!   compilation units of `C` see `A` only as a consumer,
//!   exactly as `B` does.
//!
//! Resolution is pure:
//!   identical inputs always produce identical output,
//!   nothing is cached,
//!   and nothing outside of the graph, overrides and profile is
//!   consulted.
//! A [`Resolver`] may therefore be shared between any number of threads.

use crate::{
    graph::{DepGraph, GraphError},
    module::{LinkMode, ModuleDescriptor},
    platform::PlatformProfile,
};
use fxhash::FxHashMap;
use std::{
    error::Error,
    fmt::{self, Display},
};

pub mod trace;

use trace::{DefaultTrace, ResolverTrace};

/// A [`Result`] with a hard-coded [`ResolveError`] error type.
pub type ResolveResult<T> = Result<T, ResolveError>;

/// Whether a translation unit is compiling a module's own sources or the
///   sources of one of its consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    AsOwner,
    AsConsumer,
}

impl Role {
    /// Role of `target` from the perspective of a translation unit of
    ///   `unit`.
    pub fn for_unit(unit: &str, target: &str) -> Self {
        if unit == target {
            Self::AsOwner
        } else {
            Self::AsConsumer
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::AsOwner => write!(f, "owner"),
            Self::AsConsumer => write!(f, "consumer"),
        }
    }
}

/// The concrete link mode of a module within a particular build.
///
/// This is a [`LinkMode`] with [`LinkMode::DualUse`] decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectiveMode {
    Static,
    Shared,
}

impl EffectiveMode {
    /// Parse the configuration spelling of an override.
    pub fn from_config(s: &str) -> Option<Self> {
        match s {
            "static" => Some(Self::Static),
            "shared" => Some(Self::Shared),
            _ => None,
        }
    }
}

impl From<EffectiveMode> for LinkMode {
    fn from(mode: EffectiveMode) -> Self {
        match mode {
            EffectiveMode::Static => Self::Static,
            EffectiveMode::Shared => Self::Shared,
        }
    }
}

impl Display for EffectiveMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        Display::fmt(&LinkMode::from(*self), f)
    }
}

/// A single visibility query.
///
/// The `consumer` is the module whose build configuration applies,
///   which is the module whose translation unit is being compiled.
/// The `target` is the module whose export token is being evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionContext<'a> {
    consumer: &'a str,
    target: &'a str,
    role: Role,
}

impl<'a> ResolutionContext<'a> {
    /// A query with an explicit role.
    ///
    /// This is how both branches of a header are resolved under the build
    ///   configuration of a single consumer.
    pub fn new(consumer: &'a str, target: &'a str, role: Role) -> Self {
        Self {
            consumer,
            target,
            role,
        }
    }

    /// A query from a translation unit of `unit`,
    ///   deriving the role.
    ///
    /// See [`Role::for_unit`].
    pub fn compiling(unit: &'a str, target: &'a str) -> Self {
        Self::new(unit, target, Role::for_unit(unit, target))
    }

    pub fn consumer(&self) -> &'a str {
        self.consumer
    }

    pub fn target(&self) -> &'a str {
        self.target
    }

    pub fn role(&self) -> Role {
        self.role
    }
}

impl<'a> Display for ResolutionContext<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "`{}` as {} for `{}`",
            self.target, self.role, self.consumer
        )
    }
}

/// What a module's export token must expand to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolvedVisibility {
    /// No decoration.
    Hidden,

    /// The platform's export keyword.
    ExportExplicit,

    /// The platform's import keyword.
    ImportExplicit,

    /// The platform's default-visibility attribute.
    DefaultVisibilityAttribute,
}

impl Display for ResolvedVisibility {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Hidden => write!(f, "hidden"),
            Self::ExportExplicit => write!(f, "export"),
            Self::ImportExplicit => write!(f, "import"),
            Self::DefaultVisibilityAttribute => {
                write!(f, "default visibility")
            }
        }
    }
}

/// Link mode selections for [`LinkMode::DualUse`] modules within a single
///   build.
///
/// A selection may apply to a single consumer or to the entire build;
///   the former takes precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkOverrides {
    build: FxHashMap<String, EffectiveMode>,
    consumer: FxHashMap<String, FxHashMap<String, EffectiveMode>>,
}

impl LinkOverrides {
    pub fn new() -> Self {
        Default::default()
    }

    /// Select `mode` for `module` throughout the build,
    ///   returning any previous build-wide selection.
    pub fn set_build<S: Into<String>>(
        &mut self,
        module: S,
        mode: EffectiveMode,
    ) -> Option<EffectiveMode> {
        self.build.insert(module.into(), mode)
    }

    /// Select `mode` for `module` when compiling `consumer`,
    ///   returning any previous selection for that pair.
    pub fn set_consumer<S: Into<String>>(
        &mut self,
        consumer: S,
        module: S,
        mode: EffectiveMode,
    ) -> Option<EffectiveMode> {
        self.consumer
            .entry(consumer.into())
            .or_default()
            .insert(module.into(), mode)
    }

    /// The selection for `module` when compiling `consumer`,
    ///   if any.
    pub fn lookup(&self, consumer: &str, module: &str) -> Option<EffectiveMode> {
        self.consumer
            .get(consumer)
            .and_then(|modules| modules.get(module))
            .or_else(|| self.build.get(module))
            .copied()
    }

    /// Whether there is a build-wide selection for `module`.
    pub fn has_build(&self, module: &str) -> bool {
        self.build.contains_key(module)
    }

    pub fn is_empty(&self) -> bool {
        self.build.is_empty() && self.consumer.is_empty()
    }
}

/// Resolves [`ResolvedVisibility`] for [`ResolutionContext`]s against a
///   resolved [`DepGraph`].
///
/// See the [module-level documentation](self) for the decision table.
pub struct Resolver<'g, T: ResolverTrace = DefaultTrace> {
    graph: &'g DepGraph,
    overrides: &'g LinkOverrides,
    trace: T,
}

impl<'g> Resolver<'g> {
    pub fn new(graph: &'g DepGraph, overrides: &'g LinkOverrides) -> Self {
        Self::with_trace(graph, overrides, Default::default())
    }
}

impl<'g, T: ResolverTrace> Resolver<'g, T> {
    /// Create a resolver reporting each decision to `trace`.
    pub fn with_trace(
        graph: &'g DepGraph,
        overrides: &'g LinkOverrides,
        trace: T,
    ) -> Self {
        Self {
            graph,
            overrides,
            trace,
        }
    }

    pub fn graph(&self) -> &'g DepGraph {
        self.graph
    }

    /// Resolve the visibility of the target of `ctx`.
    ///
    /// Errors
    /// ======
    /// - [`ResolveError::Graph`] if either module of `ctx` is not in the
    ///     graph.
    /// - [`ResolveError::UnresolvedLinkMode`] if the target is
    ///     [`LinkMode::DualUse`] and no override selects a mode for the
    ///     consumer.
    pub fn resolve(
        &self,
        ctx: &ResolutionContext,
        profile: &PlatformProfile,
    ) -> ResolveResult<ResolvedVisibility> {
        let result = self
            .effective_mode(ctx.consumer(), ctx.target())
            .map(|mode| decide(mode, ctx.role(), profile));

        self.trace.trace_resolution(ctx, profile, &result);

        result
    }

    /// Resolve `target` from a translation unit of `unit`.
    ///
    /// See [`ResolutionContext::compiling`].
    pub fn resolve_unit(
        &self,
        unit: &str,
        target: &str,
        profile: &PlatformProfile,
    ) -> ResolveResult<ResolvedVisibility> {
        self.resolve(&ResolutionContext::compiling(unit, target), profile)
    }

    /// The mode `target` is linked with by `consumer`.
    pub fn effective_mode(
        &self,
        consumer: &str,
        target: &str,
    ) -> ResolveResult<EffectiveMode> {
        let _ = self.graph.lookup(consumer)?;

        self.effective_mode_of(consumer, self.graph.lookup(target)?)
    }

    /// Preprocessor definitions for translation units of `unit`.
    ///
    /// These definitions are only needed on platforms with distinct import
    ///   and export keywords,
    ///     where they select between the branches of export headers:
    ///
    ///   - the owner build flag of `unit` if it is linked shared;
    ///   - the static flag of `unit` if it is linked static; and
    ///   - the static flag of every transitive dependency that `unit`
    ///       links statically,
    ///         so that hand-written headers using that flag also select
    ///         correctly.
    ///
    /// Definitions are ordered as above,
    ///   with dependencies in declaration order.
    pub fn compile_defines(
        &self,
        unit: &str,
        profile: &PlatformProfile,
    ) -> ResolveResult<Vec<String>> {
        let module = self.graph.lookup(unit)?;

        if !profile.import_export_distinct() {
            return Ok(vec![]);
        }

        let mut defines = vec![match self.effective_mode_of(unit, module)? {
            EffectiveMode::Shared => module.own_export_define().to_string(),
            EffectiveMode::Static => module.static_define().to_string(),
        }];

        for dep in self.graph.transitive_dependencies(unit)? {
            if self.effective_mode_of(unit, dep)? == EffectiveMode::Static {
                defines.push(dep.static_define().to_string());
            }
        }

        Ok(defines)
    }

    fn effective_mode_of(
        &self,
        consumer: &str,
        target: &ModuleDescriptor,
    ) -> ResolveResult<EffectiveMode> {
        match target.link_mode() {
            LinkMode::Static => Ok(EffectiveMode::Static),
            LinkMode::Shared => Ok(EffectiveMode::Shared),
            LinkMode::DualUse => self
                .overrides
                .lookup(consumer, target.name())
                .ok_or_else(|| ResolveError::UnresolvedLinkMode {
                    module: target.name().into(),
                    consumer: consumer.into(),
                }),
        }
    }
}

/// Apply the decision table to a module of a known mode.
///
/// This is the entirety of the visibility decision;
///   everything else in this module exists to determine `mode`.
pub fn decide(
    mode: EffectiveMode,
    role: Role,
    profile: &PlatformProfile,
) -> ResolvedVisibility {
    use ResolvedVisibility::*;

    match (mode, profile.import_export_distinct(), role) {
        (EffectiveMode::Static, _, _) => Hidden,
        (EffectiveMode::Shared, true, Role::AsOwner) => ExportExplicit,
        (EffectiveMode::Shared, true, Role::AsConsumer) => ImportExplicit,
        (EffectiveMode::Shared, false, _) => DefaultVisibilityAttribute,
    }
}

/// Error during visibility resolution.
#[derive(Debug, PartialEq, Eq)]
pub enum ResolveError {
    /// A query named a module that is not in the graph.
    Graph(GraphError),

    /// A [`LinkMode::DualUse`] module has no mode selected for a
    ///   consumer.
    UnresolvedLinkMode { module: String, consumer: String },

    /// Two modules share an export token,
    ///   and so would share an include guard and clobber one another's
    ///   definition.
    TokenCollision {
        token: String,
        first: String,
        second: String,
    },

    /// Two headers would be written to the same file.
    ///
    /// Header names are derived from lossy macro stems,
    ///   so distinct module names such as `sub/lib` and `sub_lib` may
    ///   map onto the same file.
    FileNameCollision {
        file_name: String,
        first: String,
        second: String,
    },
}

impl Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Graph(err) => Display::fmt(err, f),
            Self::UnresolvedLinkMode { module, consumer } => write!(
                f,
                "no link mode selected for dual-use module `{}` \
                    when compiling `{}` (select static or shared)",
                module, consumer,
            ),
            Self::TokenCollision {
                token,
                first,
                second,
            } => write!(
                f,
                "modules `{}` and `{}` share export token `{}`",
                first, second, token,
            ),
            Self::FileNameCollision {
                file_name,
                first,
                second,
            } => write!(
                f,
                "headers of `{}` and `{}` would both be written to `{}`",
                first, second, file_name,
            ),
        }
    }
}

impl Error for ResolveError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Graph(err) => Some(err),
            _ => None,
        }
    }
}

impl From<GraphError> for ResolveError {
    fn from(err: GraphError) -> Self {
        Self::Graph(err)
    }
}
