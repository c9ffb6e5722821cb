use std::{fmt, rc::Rc};

use crate::value::Value;

/// Persistent name to value mapping.
///
/// Each binding is a frame pointing at its parent, so `extend` is O(1) and
/// never touches the environment it was called on. Cloning only bumps a
/// reference count; closures hold clones of the environment they were
/// defined in.
#[derive(Clone, Default)]
pub struct Environment {
    head: Option<Rc<Frame>>,
}

struct Frame {
    name: String,
    value: Rc<Value>,
    parent: Environment,
}

impl Environment {
    pub fn new() -> Self {
        Environment { head: None }
    }

    /// A new environment with every binding of `self` plus `name`.
    pub fn extend(&self, name: impl Into<String>, value: Rc<Value>) -> Self {
        Environment {
            head: Some(Rc::new(Frame {
                name: name.into(),
                value,
                parent: self.clone(),
            })),
        }
    }

    pub fn get(&self, name: &str) -> Option<Rc<Value>> {
        self.frames()
            .find(|frame| frame.name == name)
            .map(|frame| Rc::clone(&frame.value))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.frames().any(|frame| frame.name == name)
    }

    /// Number of bindings visible in this environment.
    pub fn depth(&self) -> usize {
        self.frames().count()
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Bound names, most recent first.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.frames().map(|frame| frame.name.as_str())
    }

    /// Whether both handles refer to the very same bindings.
    pub fn ptr_eq(&self, other: &Environment) -> bool {
        match (&self.head, &other.head) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }

    fn frames(&self) -> impl Iterator<Item = &Frame> {
        std::iter::successors(self.head.as_deref(), |frame| frame.parent.head.as_deref())
    }
}

impl Drop for Environment {
    // Unlink long chains iteratively so dropping a big environment
    // does not recurse once per binding.
    fn drop(&mut self) {
        let mut next = self.head.take();
        while let Some(frame) = next {
            match Rc::try_unwrap(frame) {
                Ok(mut frame) => next = frame.parent.head.take(),
                Err(_) => break,
            }
        }
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use crate::environment::Environment;
    use crate::value::Value;

    fn int(value: i64) -> Rc<Value> {
        Rc::new(Value::Integer(value))
    }

    #[test]
    pub fn test_depth() {
        let env1 = Environment::new();
        assert_eq!(env1.depth(), 0);
        assert!(env1.is_empty());

        let env2 = env1.extend("a", int(1));
        assert_eq!(env1.depth(), 0);
        assert_eq!(env2.depth(), 1);

        let env3 = env2.extend("b", int(2));
        assert_eq!(env2.depth(), 1);
        assert_eq!(env3.depth(), 2);
    }

    #[test]
    fn test_extend_keeps_earlier_bindings() {
        let root = Environment::new();
        let env = root.extend("n1", int(1)).extend("n2", int(2));

        assert_eq!(env.get("n1"), Some(int(1)));
        assert_eq!(env.get("n2"), Some(int(2)));
        assert!(env.contains("n1"));

        // The root is never touched by extension
        assert!(root.get("n1").is_none());
        assert!(root.get("n2").is_none());
        assert!(root.is_empty());
    }

    #[test]
    fn test_siblings_do_not_see_each_other() {
        let base = Environment::new().extend("x", int(1));
        let left = base.extend("y", int(2));
        let right = base.extend("z", int(3));

        assert!(left.get("z").is_none());
        assert!(right.get("y").is_none());
        assert_eq!(base.names().collect::<Vec<_>>(), vec!["x"]);
        assert_eq!(left.names().collect::<Vec<_>>(), vec!["y", "x"]);
    }

    #[test]
    fn test_shadowing_prefers_newest() {
        let env = Environment::new().extend("x", int(1)).extend("x", int(2));
        assert_eq!(env.get("x"), Some(int(2)));
        assert_eq!(env.depth(), 2);
    }

    #[test]
    fn test_ptr_eq() {
        let env = Environment::new().extend("x", int(1));
        let copy = env.clone();
        assert!(env.ptr_eq(&copy));
        assert!(!env.ptr_eq(&env.extend("y", int(2))));
        assert!(Environment::new().ptr_eq(&Environment::new()));
    }

    #[test]
    fn test_long_chain_drops() {
        let mut env = Environment::new();
        for i in 0..200_000 {
            env = env.extend(format!("v{}", i), int(i));
        }
        assert_eq!(env.get("v0"), Some(int(0)));
        drop(env);
    }
}
