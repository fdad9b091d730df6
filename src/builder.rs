use std::marker::PhantomData;

use crate::binder::{BindOptions, bind};
use crate::error::TagbindError;
use crate::flags::FlagSet;
use crate::populate::populate;
use crate::register;
use crate::source::LookupSource;
use crate::tag::Bind;

/// Entry point for binding a struct to flags, config and environment.
pub struct Tagbind;

impl Tagbind {
    pub fn builder<T: Bind>() -> TagbindBuilder<T> {
        TagbindBuilder::new()
    }
}

/// Runs registration, binding and population with one set of options.
///
/// ```ignore
/// let opts: Options = Tagbind::builder()
///     .prefix("app")
///     .env_prefix("corp")
///     .source(Source::builder().app_name("app").build()?)
///     .parse()?;
/// ```
///
/// Sources apply in the order they were added, later ones overriding
/// earlier ones. With no sources the process-wide
/// [`source::global`](crate::source::global) is used.
pub struct TagbindBuilder<T: Bind> {
    options: BindOptions,
    sources: Vec<Box<dyn LookupSource>>,
    check_required: bool,
    _phantom: PhantomData<T>,
}

impl<T: Bind> TagbindBuilder<T> {
    fn new() -> Self {
        Self {
            options: BindOptions::default(),
            sources: Vec::new(),
            check_required: true,
            _phantom: PhantomData,
        }
    }

    /// Lookup keys become `{prefix}-{flag}`.
    pub fn prefix(mut self, prefix: &str) -> Self {
        self.options = self.options.prefix(prefix);
        self
    }

    /// Environment variables gain a leading `{ENV_PREFIX}_`.
    pub fn env_prefix(mut self, env_prefix: &str) -> Self {
        self.options = self.options.env_prefix(env_prefix);
        self
    }

    pub fn source(mut self, source: impl LookupSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Fail with [`TagbindError::MissingRequired`] when required flags are
    /// unset after binding. On by default.
    pub fn check_required(mut self, check: bool) -> Self {
        self.check_required = check;
        self
    }

    pub fn options(&self) -> &BindOptions {
        &self.options
    }

    /// Register `T`'s flags on `flags`.
    pub fn register(&self, flags: &mut FlagSet) -> Result<(), TagbindError>
    where
        T: Default,
    {
        register::register(flags, &T::default())
    }

    /// Bind `flags` against the sources, check requiredness, and populate `dest`.
    pub fn resolve_into(mut self, flags: &mut FlagSet, dest: &mut T) -> Result<(), TagbindError> {
        let mut sources: Vec<&mut dyn LookupSource> = self
            .sources
            .iter_mut()
            .map(|s| &mut **s as &mut dyn LookupSource)
            .collect();
        bind(flags, &self.options, &mut sources)?;
        if self.check_required {
            flags.check_required()?;
        }
        populate(flags, dest)
    }

    /// Like [`resolve_into`](Self::resolve_into), starting from `T::default()`.
    pub fn resolve(self, flags: &mut FlagSet) -> Result<T, TagbindError>
    where
        T: Default,
    {
        let mut value = T::default();
        self.resolve_into(flags, &mut value)?;
        Ok(value)
    }

    /// Register, parse `args` (program name first) with clap, and resolve.
    #[cfg(feature = "clap")]
    pub fn parse_from<I, A>(self, args: I) -> Result<T, TagbindError>
    where
        T: Default,
        I: IntoIterator<Item = A>,
        A: Into<std::ffi::OsString> + Clone,
    {
        let mut flags = FlagSet::new();
        self.register(&mut flags)?;
        flags.parse_from(args)?;
        self.resolve(&mut flags)
    }

    /// [`parse_from`](Self::parse_from) over the process arguments.
    ///
    /// Like clap's own `parse`, command-line errors (including `--help`)
    /// print and exit the process; every other error is returned.
    #[cfg(feature = "clap")]
    pub fn parse(self) -> Result<T, TagbindError>
    where
        T: Default,
    {
        match self.parse_from(std::env::args_os()) {
            Err(TagbindError::Cli(e)) => e.exit(),
            other => other,
        }
    }
}
