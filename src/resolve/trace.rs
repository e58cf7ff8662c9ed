// Resolver tracing
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

//! Tracing for visibility resolution.
//!
//! This provides human-readable traces on standard error any time a
//!   visibility decision is made.
//! These traces are provided automatically when `cfg(test)`,
//!   which means that they are automatically included in the output of any
//!   test failure.
//!
//! Outside of tests,
//!   this can be enabled at configuration-time using the
//!   `resolver-trace-stderr` feature flag.
//!
//! _These traces are not meant to be machine-readable!_
//! Do not try to parse them;
//!   the format is subject to change without notice.

use super::{ResolutionContext, ResolveResult, ResolvedVisibility};
use crate::platform::PlatformProfile;

/// Trace used by [`Resolver::new`](super::Resolver::new).
#[cfg(any(test, feature = "resolver-trace-stderr"))]
pub type DefaultTrace = HumanReadableTrace;

/// Trace used by [`Resolver::new`](super::Resolver::new).
#[cfg(not(any(test, feature = "resolver-trace-stderr")))]
pub type DefaultTrace = VoidTrace;

/// Observer of resolver decisions.
///
/// Tracing takes `&self` so that a resolver remains shareable between
///   threads;
///     implementations hold no state.
pub trait ResolverTrace: Default {
    /// Output a trace of a single resolution.
    ///
    /// There is no means to return an error and a failure to output the
    ///   trace should not interrupt processing.
    fn trace_resolution(
        &self,
        ctx: &ResolutionContext,
        profile: &PlatformProfile,
        result: &ResolveResult<ResolvedVisibility>,
    );
}

/// Perform no tracing.
///
/// This should be used by default for non-test builds,
///   since large graphs produce a great many decisions.
#[derive(Debug, PartialEq, Default)]
pub struct VoidTrace;

impl ResolverTrace for VoidTrace {
    fn trace_resolution(
        &self,
        _ctx: &ResolutionContext,
        _profile: &PlatformProfile,
        _result: &ResolveResult<ResolvedVisibility>,
    ) {
        // Do nothing at all.
    }
}

/// Human-readable [`ResolverTrace`] on standard error.
///
/// See [module-level](self) documentation for more information.
#[derive(Debug, PartialEq, Default)]
pub struct HumanReadableTrace;

impl ResolverTrace for HumanReadableTrace {
    fn trace_resolution(
        &self,
        ctx: &ResolutionContext,
        profile: &PlatformProfile,
        result: &ResolveResult<ResolvedVisibility>,
    ) {
        let outcome = match result {
            Ok(vis) => format!("{vis}"),
            Err(err) => format!("!!! error: {err}"),
        };

        #[allow(unused_variables)]
        let cfg = ""; // so that this compiles without matching cfg
        #[cfg(feature = "resolver-trace-stderr")]
        #[allow(unused_variables)]
        let cfg = "feature = \"resolver-trace-stderr\"";
        #[cfg(test)] // takes precedence if both are set
        let cfg = "test";

        eprint!(
            "\
[Resolver::resolve] {ctx}
| ==> on {profile}
| ==> {outcome}
= note: this trace was output as a debugging aid \
    because `cfg({cfg})`.\n\n",
        );
    }
}
