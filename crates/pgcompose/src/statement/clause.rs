//! Projection items and ORDER BY entries.

use crate::aggregate::Aggregate;
use crate::column::Column;
use crate::fragment::{Arg, Fragment, Renderable, Sealed};

/// Something that can appear in a projection, GROUP BY or ORDER BY list.
#[derive(Debug, Clone, PartialEq)]
pub enum Selectable {
    Column(Column),
    Aggregate(Box<Aggregate>),
    Fragment(Fragment),
}

impl Selectable {
    /// Projection form, including any `AS alias`.
    pub fn projection_fragment(&self) -> Fragment {
        match self {
            Selectable::Column(c) => c.projection_fragment(),
            Selectable::Aggregate(a) => a.projection_fragment(),
            Selectable::Fragment(f) => f.clone(),
        }
    }

    pub fn as_column(&self) -> Option<&Column> {
        match self {
            Selectable::Column(c) => Some(c),
            _ => None,
        }
    }

    /// Rebuild with every column passed through `f`, including those inside functions.
    pub(crate) fn map_columns(self, f: &impl Fn(Column) -> Column) -> Selectable {
        match self {
            Selectable::Column(c) => Selectable::Column(f(c)),
            Selectable::Aggregate(agg) => Selectable::Aggregate(Box::new(agg.map_columns(f))),
            other => other,
        }
    }
}

impl Sealed for Selectable {}

impl Renderable for Selectable {
    fn fragment(&self) -> Fragment {
        match self {
            Selectable::Column(c) => c.fragment(),
            Selectable::Aggregate(a) => a.fragment(),
            Selectable::Fragment(f) => f.clone(),
        }
    }
}

impl From<Column> for Selectable {
    fn from(c: Column) -> Self {
        Selectable::Column(c)
    }
}

impl From<&Column> for Selectable {
    fn from(c: &Column) -> Self {
        Selectable::Column(c.clone())
    }
}

impl From<Aggregate> for Selectable {
    fn from(a: Aggregate) -> Self {
        Selectable::Aggregate(Box::new(a))
    }
}

impl From<Fragment> for Selectable {
    fn from(f: Fragment) -> Self {
        Selectable::Fragment(f)
    }
}

/// One ORDER BY entry. Direction and NULLS placement are emitted only when set.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    target: Selectable,
    ascending: Option<bool>,
    nulls_first: Option<bool>,
}

impl OrderBy {
    pub fn new(target: impl Into<Selectable>) -> Self {
        Self {
            target: target.into(),
            ascending: None,
            nulls_first: None,
        }
    }

    /// Build from the `(target, ascending, nulls_first)` triple.
    pub fn from_parts(
        target: impl Into<Selectable>,
        ascending: Option<bool>,
        nulls_first: Option<bool>,
    ) -> Self {
        Self {
            target: target.into(),
            ascending,
            nulls_first,
        }
    }

    pub fn asc(mut self) -> Self {
        self.ascending = Some(true);
        self
    }

    pub fn desc(mut self) -> Self {
        self.ascending = Some(false);
        self
    }

    pub fn nulls_first(mut self) -> Self {
        self.nulls_first = Some(true);
        self
    }

    pub fn nulls_last(mut self) -> Self {
        self.nulls_first = Some(false);
        self
    }

    pub fn target(&self) -> &Selectable {
        &self.target
    }

    pub(crate) fn map_target(self, f: impl FnOnce(Selectable) -> Selectable) -> Self {
        Self {
            target: f(self.target),
            ..self
        }
    }
}

impl Sealed for OrderBy {}

impl Renderable for OrderBy {
    fn fragment(&self) -> Fragment {
        let mut template = String::from("{}");
        match self.ascending {
            Some(true) => template.push_str(" ASC"),
            Some(false) => template.push_str(" DESC"),
            None => {}
        }
        match self.nulls_first {
            Some(true) => template.push_str(" NULLS FIRST"),
            Some(false) => template.push_str(" NULLS LAST"),
            None => {}
        }
        Fragment::from_parts(template, vec![Arg::Fragment(self.target.fragment())], Vec::new())
    }
}

impl From<Column> for OrderBy {
    fn from(c: Column) -> Self {
        OrderBy::new(c)
    }
}

impl From<&Column> for OrderBy {
    fn from(c: &Column) -> Self {
        OrderBy::new(c)
    }
}

impl From<Aggregate> for OrderBy {
    fn from(a: Aggregate) -> Self {
        OrderBy::new(a)
    }
}
