// Build configuration reader
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

//! Build configuration files.
//!
//! A build configuration lists every module of a build,
//!   optionally names the target platform,
//!   and selects link modes for dual-use modules:
//!
//! ```
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use symvis::config::BuildConfig;
//! use symvis::resolve::EffectiveMode;
//!
//! let config = BuildConfig::parse(r#"
//!   <linkage platform="windows">
//!     <module name="libinner" mode="shared" />
//!     <module name="libouter" mode="dual" token="LIBOUTER_PUBLIC">
//!       <dep name="libinner" />
//!     </module>
//!     <module name="prog" mode="static">
//!       <dep name="libouter" />
//!     </module>
//!
//!     <override module="libouter" mode="shared" />
//!     <override module="libouter" consumer="prog" mode="static" />
//!   </linkage>
//! "#)?;
//!
//! assert_eq!(Some("windows"), config.platform());
//! assert_eq!(3, config.modules().len());
//! assert_eq!(
//!     Some(EffectiveMode::Static),
//!     config.overrides().lookup("prog", "libouter"),
//! );
//! # Ok(())
//! # }
//! ```
//!
//! The `mode` of a module is one of `static`, `shared` or `dual`;
//!   overrides must select `static` or `shared`.
//! `token` and `define` override the export token and owner build flag
//!   that would otherwise be derived from the module name
//!     (see [`library_macro`](crate::module::library_macro)).
//!
//! Reading is performed with [`quick_xml`].
//! The configuration is small and is read entirely into memory.

use crate::{
    graph::{DepGraph, DepGraphBuilder, GraphResult},
    module::{LinkMode, ModuleDescriptor},
    resolve::{EffectiveMode, LinkOverrides},
};
use fxhash::FxHashMap;
use quick_xml::{
    events::{BytesStart, Event},
    Reader,
};
use std::{
    error::Error,
    fmt::{self, Display},
};

/// A [`Result`] with a hard-coded [`ConfigError`] error type.
pub type ConfigResult<T> = Result<T, ConfigError>;

const ELE_ROOT: &[u8] = b"linkage";
const ELE_MODULE: &[u8] = b"module";
const ELE_DEP: &[u8] = b"dep";
const ELE_OVERRIDE: &[u8] = b"override";

/// Configuration of a single build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildConfig {
    platform: Option<String>,
    modules: Vec<ModuleDescriptor>,
    overrides: LinkOverrides,
}

impl BuildConfig {
    /// Parse a configuration document.
    pub fn parse(src: &str) -> ConfigResult<Self> {
        ConfigReader::new(src).read()
    }

    /// Target platform named by the configuration,
    ///   if any.
    pub fn platform(&self) -> Option<&str> {
        self.platform.as_deref()
    }

    /// Modules in declaration order.
    pub fn modules(&self) -> &[ModuleDescriptor] {
        &self.modules
    }

    pub fn overrides(&self) -> &LinkOverrides {
        &self.overrides
    }

    /// Mutable access to overrides,
    ///   for selections made outside of the configuration file.
    pub fn overrides_mut(&mut self) -> &mut LinkOverrides {
        &mut self.overrides
    }

    /// Build the dependency graph,
    ///   yielding it along with the overrides for the build.
    pub fn into_graph(self) -> GraphResult<(DepGraph, LinkOverrides)> {
        let Self {
            platform: _,
            modules,
            overrides,
        } = self;

        let mut builder = DepGraphBuilder::with_capacity(modules.len());

        for module in modules {
            builder.add_module(module)?;
        }

        Ok((builder.resolve_dependencies()?, overrides))
    }
}

/// Event-driven reader producing a [`BuildConfig`].
struct ConfigReader<'a> {
    reader: Reader<&'a [u8]>,
    seen_root: bool,

    /// Module whose children are currently being read.
    module: Option<ModuleDescriptor>,

    config: BuildConfig,
}

impl<'a> ConfigReader<'a> {
    fn new(src: &'a str) -> Self {
        let mut reader = Reader::from_str(src);
        reader.trim_text(true);

        Self {
            reader,
            seen_root: false,
            module: None,
            config: Default::default(),
        }
    }

    fn read(mut self) -> ConfigResult<BuildConfig> {
        loop {
            match self.reader.read_event()? {
                Event::Start(ele) => self.open(&ele, false)?,
                Event::Empty(ele) => self.open(&ele, true)?,

                Event::End(ele) if ele.name().as_ref() == ELE_MODULE => {
                    if let Some(module) = self.module.take() {
                        self.config.modules.push(module);
                    }
                }

                Event::Eof => break,

                // Comments, whitespace, declarations, and closing tags of
                //   elements with nothing to finalize.
                _ => (),
            }
        }

        if !self.seen_root {
            return Err(ConfigError::UnexpectedRoot(String::new()));
        }

        if let Some(module) = self.module {
            return Err(ConfigError::UnclosedModule(module.name().into()));
        }

        Ok(self.config)
    }

    fn open(&mut self, ele: &BytesStart, empty: bool) -> ConfigResult<()> {
        let name = ele.name();

        if !self.seen_root {
            if name.as_ref() != ELE_ROOT {
                return Err(ConfigError::UnexpectedRoot(ele_name(ele)));
            }

            self.seen_root = true;

            let mut attrs = attrs(ele)?;
            self.config.platform = attrs.remove("platform");
            no_extra_attrs(attrs, ELE_ROOT)?;

            return Ok(());
        }

        match name.as_ref() {
            ELE_MODULE if self.module.is_none() => {
                let module = Self::process_module(ele)?;

                if empty {
                    self.config.modules.push(module);
                } else {
                    self.module = Some(module);
                }
            }

            ELE_DEP => match self.module.as_mut() {
                Some(module) => {
                    let mut attrs = attrs(ele)?;
                    module.add_dep(required(&mut attrs, ELE_DEP, "name")?);
                    no_extra_attrs(attrs, ELE_DEP)?;
                }
                None => return Err(ConfigError::DepOutsideModule),
            },

            ELE_OVERRIDE if self.module.is_none() => {
                self.process_override(ele)?
            }

            _ => return Err(ConfigError::UnexpectedElement(ele_name(ele))),
        }

        Ok(())
    }

    fn process_module(ele: &BytesStart) -> ConfigResult<ModuleDescriptor> {
        let mut attrs = attrs(ele)?;

        let name = required(&mut attrs, ELE_MODULE, "name")?;
        let mode_str = required(&mut attrs, ELE_MODULE, "mode")?;

        let mode = LinkMode::from_config(&mode_str)
            .ok_or(ConfigError::InvalidLinkMode(mode_str))?;

        let mut module = ModuleDescriptor::new(name, mode);

        if let Some(token) = attrs.remove("token") {
            module = module.with_token(token);
        }

        if let Some(define) = attrs.remove("define") {
            module = module.with_own_export_define(define);
        }

        no_extra_attrs(attrs, ELE_MODULE)?;

        Ok(module)
    }

    fn process_override(&mut self, ele: &BytesStart) -> ConfigResult<()> {
        let mut attrs = attrs(ele)?;

        let module = required(&mut attrs, ELE_OVERRIDE, "module")?;
        let mode_str = required(&mut attrs, ELE_OVERRIDE, "mode")?;

        let mode = EffectiveMode::from_config(&mode_str)
            .ok_or(ConfigError::InvalidOverrideMode(mode_str))?;
        let consumer = attrs.remove("consumer");

        no_extra_attrs(attrs, ELE_OVERRIDE)?;

        match consumer {
            Some(consumer) => {
                self.config.overrides.set_consumer(consumer, module, mode)
            }
            None => self.config.overrides.set_build(module, mode),
        };

        Ok(())
    }
}

fn ele_name(ele: &BytesStart) -> String {
    String::from_utf8_lossy(ele.name().as_ref()).into_owned()
}

/// Unescaped attributes of `ele`.
fn attrs(ele: &BytesStart) -> ConfigResult<FxHashMap<String, String>> {
    let mut map = FxHashMap::default();

    for attr in ele.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;

        map.insert(
            String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
            attr.unescape_value()?.into_owned(),
        );
    }

    Ok(map)
}

fn required(
    attrs: &mut FxHashMap<String, String>,
    ele: &'static [u8],
    attr: &'static str,
) -> ConfigResult<String> {
    attrs.remove(attr).ok_or_else(|| ConfigError::MissingAttr {
        ele: String::from_utf8_lossy(ele).into_owned(),
        attr,
    })
}

/// Fail on any attribute left over after processing `ele`.
///
/// The first such attribute by name is reported,
///   so that the error does not depend on hash order.
fn no_extra_attrs(
    attrs: FxHashMap<String, String>,
    ele: &'static [u8],
) -> ConfigResult<()> {
    match attrs.into_keys().min() {
        Some(attr) => Err(ConfigError::UnexpectedAttr {
            ele: String::from_utf8_lossy(ele).into_owned(),
            attr,
        }),
        None => Ok(()),
    }
}

/// Error reading a build configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// The document is not well-formed XML.
    Xml(quick_xml::Error),

    /// The root element is not `linkage`,
    ///   or there is no root element at all (empty name).
    UnexpectedRoot(String),

    /// An element is not permitted where it appears.
    UnexpectedElement(String),

    /// A required attribute is missing.
    MissingAttr { ele: String, attr: &'static str },

    /// An attribute is not recognized on its element.
    UnexpectedAttr { ele: String, attr: String },

    /// A module's `mode` is not `static`, `shared` or `dual`.
    InvalidLinkMode(String),

    /// An override's `mode` is not `static` or `shared`.
    InvalidOverrideMode(String),

    /// A `dep` appears outside of a `module`.
    DepOutsideModule,

    /// The document ended before a `module` element was closed.
    UnclosedModule(String),
}

impl From<quick_xml::Error> for ConfigError {
    fn from(err: quick_xml::Error) -> Self {
        Self::Xml(err)
    }
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use ConfigError::*;

        match self {
            Xml(err) => write!(f, "malformed configuration: {}", err),
            UnexpectedRoot(name) if name.is_empty() => {
                write!(f, "configuration has no `linkage` root element")
            }
            UnexpectedRoot(name) => write!(
                f,
                "expected `linkage` root element, found `{}`",
                name
            ),
            UnexpectedElement(name) => {
                write!(f, "unexpected element `{}`", name)
            }
            MissingAttr { ele, attr } => {
                write!(f, "`{}` element is missing `@{}`", ele, attr)
            }
            UnexpectedAttr { ele, attr } => {
                write!(f, "unexpected attribute `@{}` on `{}`", attr, ele)
            }
            InvalidLinkMode(mode) => write!(
                f,
                "invalid link mode `{}` (expected static, shared or dual)",
                mode
            ),
            InvalidOverrideMode(mode) => write!(
                f,
                "invalid override mode `{}` (expected static or shared)",
                mode
            ),
            DepOutsideModule => {
                write!(f, "`dep` element must appear within a `module`")
            }
            UnclosedModule(name) => {
                write!(f, "unclosed `module` element for `{}`", name)
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Xml(err) => Some(err),
            _ => None,
        }
    }
}
