// Target platform visibility profiles
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

//! Static description of a target platform's symbol visibility mechanism.
//!
//! Platforms fall into two families:
//!
//!   - Platforms with import libraries (Windows-style),
//!       which require a distinct keyword for exporting a symbol from the
//!       library that defines it and for importing that symbol into a
//!       consumer; and
//!   - Platforms where a single default-visibility attribute is placed on
//!       a declaration regardless of whether it is being defined or
//!       consumed (POSIX-style).
//!
//! The keywords themselves are opaque tokens;
//!   nothing in this system interprets them,
//!   they are only ever copied into generated headers.
//!
//! A [`PlatformProfile`] is immutable once constructed.
//! One instance is expected per target platform and is shared read-only
//!   by every resolution.

use std::{
    error::Error,
    fmt::{self, Display},
};

/// Keyword exporting a symbol from a DLL.
pub const DLLEXPORT: &str = "__declspec(dllexport)";

/// Keyword importing a symbol from a DLL.
pub const DLLIMPORT: &str = "__declspec(dllimport)";

/// Attribute giving a symbol default visibility in a shared object.
pub const GNU_DEFAULT_VISIBILITY: &str = "[[gnu::visibility(\"default\")]]";

/// Names of every platform preset known to [`PlatformProfile::by_name`].
pub const KNOWN_PLATFORMS: [&str; 5] =
    ["posix", "linux", "darwin", "cygwin", "windows"];

/// Visibility mechanism of a target platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformProfile {
    name: String,
    import_export_distinct: bool,
    export_keyword: String,
    import_keyword: String,
    default_visibility_attribute: String,
}

impl PlatformProfile {
    /// Construct an arbitrary profile.
    ///
    /// Most callers will want one of the presets provided by
    ///   [`PlatformProfile::by_name`].
    pub fn new<S: Into<String>>(
        name: S,
        import_export_distinct: bool,
        export_keyword: S,
        import_keyword: S,
        default_visibility_attribute: S,
    ) -> Self {
        Self {
            name: name.into(),
            import_export_distinct,
            export_keyword: export_keyword.into(),
            import_keyword: import_keyword.into(),
            default_visibility_attribute: default_visibility_attribute.into(),
        }
    }

    /// A POSIX-style platform named `name`.
    ///
    /// Shared objects use the same default-visibility attribute for both
    ///   the producer and the consumer.
    pub fn posix<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            import_export_distinct: false,
            export_keyword: String::new(),
            import_keyword: String::new(),
            default_visibility_attribute: GNU_DEFAULT_VISIBILITY.into(),
        }
    }

    /// A platform with import libraries named `name`.
    pub fn windows<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            import_export_distinct: true,
            export_keyword: DLLEXPORT.into(),
            import_keyword: DLLIMPORT.into(),
            default_visibility_attribute: String::new(),
        }
    }

    /// Look up a platform preset by name.
    ///
    /// Cygwin targets produce DLLs with import libraries,
    ///   and so are grouped with Windows despite otherwise being POSIX.
    pub fn by_name(name: &str) -> Result<Self, PlatformError> {
        match name {
            "posix" | "linux" | "darwin" => Ok(Self::posix(name)),
            "cygwin" | "windows" => Ok(Self::windows(name)),
            _ => Err(PlatformError::UnknownPlatform(name.into())),
        }
    }

    /// Name of the platform that this program was compiled for.
    ///
    /// This exists for the configuration layer to pick a default target;
    ///   resolution itself never consults the host.
    pub fn host_name() -> &'static str {
        if cfg!(windows) {
            "windows"
        } else if cfg!(target_os = "cygwin") {
            "cygwin"
        } else if cfg!(target_os = "macos") {
            "darwin"
        } else if cfg!(target_os = "linux") {
            "linux"
        } else {
            "posix"
        }
    }

    /// Preset for the host platform.
    pub fn host() -> Self {
        match Self::by_name(Self::host_name()) {
            Ok(profile) => profile,
            Err(_) => Self::posix("posix"),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether exporting and importing a symbol require different
    ///   keywords.
    pub fn import_export_distinct(&self) -> bool {
        self.import_export_distinct
    }

    pub fn export_keyword(&self) -> &str {
        &self.export_keyword
    }

    pub fn import_keyword(&self) -> &str {
        &self.import_keyword
    }

    pub fn default_visibility_attribute(&self) -> &str {
        &self.default_visibility_attribute
    }
}

impl Display for PlatformProfile {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mechanism = if self.import_export_distinct {
            "import/export keywords"
        } else {
            "default visibility attribute"
        };

        write!(f, "platform `{}` ({})", self.name, mechanism)
    }
}

/// Error looking up a platform.
#[derive(Debug, PartialEq, Eq)]
pub enum PlatformError {
    /// No preset exists by the given name.
    UnknownPlatform(String),
}

impl Display for PlatformError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::UnknownPlatform(name) => write!(
                f,
                "unknown platform `{}` (expected one of: {})",
                name,
                KNOWN_PLATFORMS.join(", "),
            ),
        }
    }
}

impl Error for PlatformError {}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn posix_presets_use_symmetric_attribute() {
        for name in ["posix", "linux", "darwin"] {
            let profile = PlatformProfile::by_name(name).unwrap();

            assert_eq!(name, profile.name());
            assert!(!profile.import_export_distinct());
            assert_eq!(
                GNU_DEFAULT_VISIBILITY,
                profile.default_visibility_attribute()
            );
        }
    }

    #[test]
    fn import_library_presets_use_distinct_keywords() {
        for name in ["cygwin", "windows"] {
            let profile = PlatformProfile::by_name(name).unwrap();

            assert!(profile.import_export_distinct());
            assert_eq!(DLLEXPORT, profile.export_keyword());
            assert_eq!(DLLIMPORT, profile.import_keyword());
            assert_ne!(profile.export_keyword(), profile.import_keyword());
        }
    }

    #[test]
    fn every_known_platform_has_preset() {
        for name in KNOWN_PLATFORMS {
            assert!(PlatformProfile::by_name(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn unknown_platform_fails() {
        assert_eq!(
            Err(PlatformError::UnknownPlatform("amiga".into())),
            PlatformProfile::by_name("amiga"),
        );
    }

    #[test]
    fn host_is_known_preset() {
        assert!(KNOWN_PLATFORMS.contains(&PlatformProfile::host_name()));
        assert_eq!(PlatformProfile::host_name(), PlatformProfile::host().name());
    }

    #[test]
    fn custom_profile_keeps_tokens_verbatim() {
        let profile =
            PlatformProfile::new("os2", true, "_Export", "_Import", "");

        assert_eq!("_Export", profile.export_keyword());
        assert_eq!("_Import", profile.import_keyword());
        assert_eq!("", profile.default_visibility_attribute());
    }
}
