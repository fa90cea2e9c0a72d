//! The main page assembled from every feature's `MainPage.<name>.*` resources.

use std::fmt;

use featkit::{read, AssemblyResult, ResourceMap, RootNode, Selector};

const LINKS: &str = "MainPage.*.link@withKeys";
const BODIES: &str = "MainPage.*.body@withKeys";

/// One feature's entry on the main page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub feature: String,
    pub link: String,
    pub body: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MainPageView {
    pub title: String,
    pub sections: Vec<Section>,
    /// Root this view replaced during composition.
    pub nested: RootNode,
}

impl MainPageView {
    /// Sections follow link definition order.
    pub fn from_resources(
        title: &str,
        map: &ResourceMap,
        nested: RootNode,
    ) -> AssemblyResult<Self> {
        let out = read(map, Selector::props([("links", LINKS), ("bodies", BODIES)]))?;
        let links = out.prop("links").map(|r| r.pairs_of::<String>()).unwrap_or_default();
        let bodies = out.prop("bodies").map(|r| r.pairs_of::<String>()).unwrap_or_default();

        let sections = links
            .into_iter()
            .filter_map(|(key, link)| {
                let feature = section_name(key)?;
                let body = bodies
                    .iter()
                    .find(|(k, _)| section_name(k) == Some(feature))
                    .map(|(_, b)| (*b).clone());
                Some(Section {
                    feature: feature.to_string(),
                    link: link.clone(),
                    body,
                })
            })
            .collect();

        Ok(Self {
            title: title.to_string(),
            sections,
            nested,
        })
    }

    pub fn section(&self, feature: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.feature == feature)
    }
}

/// `MainPage.cart.link` -> `cart`.
fn section_name(key: &str) -> Option<&str> {
    key.split('.').nth(1)
}

impl fmt::Display for MainPageView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "== {} ==", self.title)?;
        for s in &self.sections {
            match &s.body {
                Some(body) => writeln!(f, "[{}] {}", s.link, body)?,
                None => writeln!(f, "[{}]", s.link)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_names_come_from_the_middle_segment() {
        assert_eq!(section_name("MainPage.cart.link"), Some("cart"));
        assert_eq!(section_name("MainPage"), None);
    }

    #[test]
    fn renders_links_with_optional_bodies() {
        let view = MainPageView {
            title: "Shop".into(),
            sections: vec![
                Section {
                    feature: "cart".into(),
                    link: "Cart".into(),
                    body: Some("Your shopping cart".into()),
                },
                Section {
                    feature: "help".into(),
                    link: "Help".into(),
                    body: None,
                },
            ],
            nested: RootNode::empty(),
        };
        assert_eq!(
            view.to_string(),
            "== Shop ==\n[Cart] Your shopping cart\n[Help]\n"
        );
        assert!(view.section("help").is_some_and(|s| s.body.is_none()));
    }
}
