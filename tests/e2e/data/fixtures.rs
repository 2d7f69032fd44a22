//! 测试数据 Fixtures

use taxonomy::Taxonomy;

/// 预置分类
pub struct TestTaxonomies;

impl TestTaxonomies {
    pub fn animals() -> Taxonomy {
        Taxonomy::new("tx-001", "animals")
    }

    pub fn birds() -> Taxonomy {
        Taxonomy::new("tx-002", "birds")
    }

    pub fn fungi() -> Taxonomy {
        Taxonomy::new("tx-003", "fungi")
    }

    pub fn plants() -> Taxonomy {
        Taxonomy::new("tx-004", "plants")
    }

    /// 按 id 排序
    pub fn all() -> Vec<Taxonomy> {
        vec![Self::animals(), Self::birds(), Self::fungi(), Self::plants()]
    }
}
