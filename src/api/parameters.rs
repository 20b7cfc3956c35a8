use rouille::Request;
use std::collections::HashMap;
use url::form_urlencoded;

/// Query string parameters. The first occurrence of a key wins.
pub struct RequestParameters {
    values: HashMap<String, String>,
}

impl RequestParameters {
    pub fn new(req: &Request) -> Self {
        RequestParameters::from_query(req.raw_query_string())
    }

    pub fn from_query(query: &str) -> Self {
        let mut values = HashMap::new();
        for (key, val) in form_urlencoded::parse(query.as_bytes()) {
            trace!("query '{}' => '{}'", key, val);
            values.entry(key.into_owned()).or_insert_with(|| val.into_owned());
        }
        RequestParameters { values }
    }

    pub fn get_string(&self, name: &str) -> Option<String> {
        self.values.get(name).map(String::from)
    }

    /// Only the literal strings `true` and `false` are understood.
    pub fn get_bool(&self, name: &str, default: bool) -> bool {
        match self.values.get(name) {
            Some(v) => v.parse::<bool>().unwrap_or(default),
            None => default,
        }
    }

    pub fn get_integer(&self, name: &str) -> Option<i64> {
        let v = self.values.get(name)?;
        if v.is_empty() {
            return None;
        }
        match v.trim().parse::<i64>() {
            Ok(parsed) => Some(parsed),
            Err(_) => {
                debug!("could not parse '{}' for '{}'", v, name);
                None
            }
        }
    }
}
