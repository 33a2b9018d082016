/// Iterator over the `key=value` pairs of a model string.
///
/// Keys are ASCII letters and underscores and are lowercased; values are
/// either bare alphanumeric tokens or double-quoted strings. On a
/// malformed pair the offending key is yielded as the error and iteration
/// stops.
pub(crate) struct KeyValIter<'a> {
    rest: &'a str,
    stop: bool,
}

impl<'a> KeyValIter<'a> {
    pub fn new(s: &'a str) -> KeyValIter<'a> {
        KeyValIter { rest: s, stop: false }
    }

    fn fail(&mut self, key: &str) -> Option<Result<(String, String), String>> {
        self.stop = true;
        Some(Err(key.to_owned()))
    }
}

impl Iterator for KeyValIter<'_> {
    type Item = Result<(String, String), String>;
    fn next(&mut self) -> Option<Self::Item> {
        if self.stop {
            return None;
        }
        self.rest = self.rest.trim_start();
        if self.rest.is_empty() {
            return None;
        }
        let (key, after) = match self.rest.split_once('=') {
            Some(kv) => kv,
            None => {
                let key = self.rest.to_owned();
                return self.fail(&key);
            }
        };
        if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphabetic() || c == '_') {
            let key = key.to_owned();
            return self.fail(&key);
        }
        let (value, remain) = if let Some(quoted) = after.strip_prefix('"') {
            match quoted.split_once('"') {
                Some((value, remain)) => (value, remain),
                None => return self.fail(key),
            }
        } else {
            let end = after
                .find(char::is_whitespace)
                .unwrap_or(after.len());
            let (value, remain) = after.split_at(end);
            if value.is_empty() || !value.chars().all(|c| c.is_ascii_alphanumeric()) {
                return self.fail(key);
            }
            (value, remain)
        };
        let item = (key.to_ascii_lowercase(), value.to_owned());
        self.rest = remain;
        Some(Ok(item))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(s: &str) -> Vec<Result<(String, String), String>> {
        KeyValIter::new(s).collect()
    }

    #[test]
    fn plain_pairs() {
        let pairs = collect("width=32 poly=0x04c11db7  refin=true");
        assert_eq!(
            pairs,
            vec![
                Ok(("width".into(), "32".into())),
                Ok(("poly".into(), "0x04c11db7".into())),
                Ok(("refin".into(), "true".into())),
            ]
        );
    }

    #[test]
    fn quoted_and_cased() {
        let pairs = collect("NAME=\"crc 32 xz\" width=32");
        assert_eq!(
            pairs,
            vec![
                Ok(("name".into(), "crc 32 xz".into())),
                Ok(("width".into(), "32".into())),
            ]
        );
    }

    #[test]
    fn malformed_stops_iteration() {
        let pairs = collect("width=32 poly width=16");
        assert_eq!(
            pairs,
            vec![Ok(("width".into(), "32".into())), Err("poly width".into())]
        );
        assert_eq!(collect("width="), vec![Err("width".into())]);
        assert_eq!(collect("na me=\"x\""), vec![Err("na me".into())]);
    }
}
