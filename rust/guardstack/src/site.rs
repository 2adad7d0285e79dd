/// Where a stack was created. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreationSite {
    pub name: &'static str,
    pub file: &'static str,
    pub line: u32,
    pub module: &'static str,
}

impl CreationSite {
    pub const fn new(
        name: &'static str,
        file: &'static str,
        line: u32,
        module: &'static str,
    ) -> CreationSite {
        CreationSite {
            name,
            file,
            line,
            module,
        }
    }
}

impl CreationSite {
    /// Checksum of every field, folded into the stack's structural image.
    pub(crate) fn digest(&self) -> u64 {
        crate::checksum::compute_fields(&[
            self.name.as_bytes(),
            self.file.as_bytes(),
            &self.line.to_le_bytes(),
            self.module.as_bytes(),
        ])
    }
}

impl std::fmt::Display for CreationSite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{} ({})", self.file, self.line, self.module)
    }
}

/// Captures the [`CreationSite`] of the variable named `$name` at the point
/// of invocation.
///
/// ```
/// use guardstack::{GuardedStack, StackConfig, creation_site};
///
/// let stack = GuardedStack::create(StackConfig::paranoid(), Some(creation_site!(stack))).unwrap();
/// assert_eq!(stack.site().unwrap().name, "stack");
/// ```
#[macro_export]
macro_rules! creation_site {
    ($name:ident) => {
        $crate::site::CreationSite::new(stringify!($name), file!(), line!(), module_path!())
    };
}
