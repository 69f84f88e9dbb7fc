//! Destination path computation.
//!
//! Every file lands in `<root>/<year>/<month name>/<file name>`, where the
//! root is the destination directory if one was given and the source
//! directory otherwise. Month names are locale dependent; the locale is
//! supplied through [`MonthNaming`] so the computation stays independent of
//! the environment it runs in.

use chrono::{Datelike, Locale, NaiveDateTime, TimeZone, Utc};
use pure_rust_locales::locale_match;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Produces the folder name of a month (1 = January).
pub trait MonthNaming {
    fn month_name(&self, month: u32) -> String;
}

impl<F> MonthNaming for F
where
    F: Fn(u32) -> String,
{
    fn month_name(&self, month: u32) -> String {
        self(month)
    }
}

/// Full month names in a given locale.
///
/// Locales that inflect month names (`ru_RU`, `pl_PL`, `cs_CZ`, ...) carry a
/// standalone form next to the one used inside dates. Folder names use the
/// standalone form when the locale has one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocaleMonthNames {
    locale: Locale,
}

impl LocaleMonthNames {
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    /// Parses a locale tag such as `de_DE`, `fr_FR.UTF-8` or `C`.
    ///
    /// # Examples
    ///
    /// ```
    /// use datesort::destination::{LocaleMonthNames, MonthNaming};
    ///
    /// let names = LocaleMonthNames::from_tag("de_DE.UTF-8").unwrap();
    /// assert_eq!(names.month_name(3), "März");
    /// assert!(LocaleMonthNames::from_tag("xx_YY").is_none());
    /// ```
    pub fn from_tag(tag: &str) -> Option<Self> {
        let name = tag.split(['.', '@']).next().unwrap_or_default().trim();
        match name {
            "" => None,
            "C" | "POSIX" => Some(Self::new(Locale::POSIX)),
            _ => Locale::try_from(name).ok().map(Self::new),
        }
    }

    /// Uses the locale of the running environment (`LC_ALL`, `LC_TIME`,
    /// `LANG`), or the POSIX locale when none of them names a known locale.
    pub fn from_env() -> Self {
        let from_env = ["LC_ALL", "LC_TIME", "LANG"]
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|value| !value.trim().is_empty())
            .and_then(|value| Self::from_tag(&value));

        match from_env {
            Some(names) => names,
            None => {
                debug!("no usable locale in the environment, using POSIX month names");
                Self::new(Locale::POSIX)
            }
        }
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }
}

impl MonthNaming for LocaleMonthNames {
    fn month_name(&self, month: u32) -> String {
        let standalone = locale_match!(self.locale => LC_TIME::ALT_MON);
        let index = month.checked_sub(1).map(|i| i as usize);
        if let Some(name) = standalone.zip(index).and_then(|(names, i)| names.get(i)) {
            return (*name).to_string();
        }

        match Utc.with_ymd_and_hms(2000, month, 1, 0, 0, 0).single() {
            Some(date) => date.format_localized("%B", self.locale).to_string(),
            None => month.to_string(),
        }
    }
}

/// Where a file is going.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    /// `<root>/<year>/<month name>`
    pub folder: PathBuf,
    /// `<folder>/<file name>`
    pub path: PathBuf,
}

/// Computes year/month destinations for dated files.
pub struct DestinationResolver {
    month_names: Box<dyn MonthNaming>,
}

impl DestinationResolver {
    pub fn new(month_names: impl MonthNaming + 'static) -> Self {
        Self {
            month_names: Box::new(month_names),
        }
    }

    /// Returns the year/month folder for a date below `base`.
    pub fn folder(&self, base: &Path, date: NaiveDateTime) -> PathBuf {
        base.join(date.year().to_string())
            .join(self.month_names.month_name(date.month()))
    }

    /// Computes the destination folder and full target path of a file.
    ///
    /// `destination_root` takes precedence over `source_root` when present.
    pub fn resolve(
        &self,
        source_root: &Path,
        destination_root: Option<&Path>,
        date: NaiveDateTime,
        file_name: &str,
    ) -> Destination {
        let base = destination_root.unwrap_or(source_root);
        let folder = self.folder(base, date);
        let path = folder.join(file_name);
        Destination { folder, path }
    }
}

impl Default for DestinationResolver {
    fn default() -> Self {
        Self::new(LocaleMonthNames::from_env())
    }
}
