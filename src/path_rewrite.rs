use std::collections::HashMap;

/// How a source path is turned into a target path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathTransform {
    StripLeadingSegments(usize),
}

impl PathTransform {
    pub fn apply(&self, path: &str) -> String {
        match self {
            PathTransform::StripLeadingSegments(count) => path
                .split('/')
                .skip(*count)
                .collect::<Vec<&str>>()
                .join("/"),
        }
    }
}

/// Per source bucket path transforms. Buckets without a rule keep their paths.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathRewriteRules {
    rules: HashMap<String, PathTransform>,
}

impl PathRewriteRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_rule(&mut self, bucket: &str, transform: PathTransform) {
        self.rules.insert(bucket.to_string(), transform);
    }

    pub fn rule_for(&self, bucket: &str) -> Option<PathTransform> {
        self.rules.get(bucket).copied()
    }

    pub fn target_path(&self, source_bucket: &str, source_path: &str) -> String {
        match self.rule_for(source_bucket) {
            Some(transform) => transform.apply(source_path),
            None => source_path.to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
