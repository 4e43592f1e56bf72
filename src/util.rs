pub trait StrExt: AsRef<str> {
    fn nonblank_to_some(&self) -> Option<String> {
        Some(self.as_ref().trim())
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
    }

    fn first_line(&self) -> &str {
        self.as_ref()
            .split('\n')
            .next()
            .unwrap_or_default()
    }
}

impl<T: AsRef<str>> StrExt for T {}
