//! Built-in catalog presets
//!
//! The `testing-library` preset declares the surface of the React testing
//! library together with the DOM and React types its signatures mention.
//! The eight query families share one template: each family contributes a
//! matcher type and an options type, and every family is instantiated across
//! the six query variants (`getBy`, `getAllBy`, `queryBy`, `queryAllBy`,
//! `findBy`, `findAllBy`).

use tracing::debug;

use super::catalog::{Catalog, CatalogError};
use super::declarations::{member, signature, type_expr};
use super::types::{TypeDecl, TypeDeclKind};

/// Name of the testing-library preset
pub const TESTING_LIBRARY: &str = "testing-library";

/// Every preset name accepted by [`load`]
pub const PRESETS: &[&str] = &[TESTING_LIBRARY];

/// Build the named preset
pub fn load(name: &str) -> Result<Catalog, CatalogError> {
    match name {
        TESTING_LIBRARY => testing_library(),
        other => Err(CatalogError::Declaration {
            entry: other.to_string(),
            reason: format!("unknown preset (available: {})", PRESETS.join(", ")),
        }),
    }
}

/// A query family: the text a query matches on and the options it takes
#[derive(Debug, Clone, Copy)]
pub struct QueryFamily {
    pub name: &'static str,
    pub matcher: &'static str,
    pub options: &'static str,
}

pub const QUERY_FAMILIES: [QueryFamily; 8] = [
    QueryFamily { name: "AltText", matcher: "TextMatch", options: "MatcherOptions" },
    QueryFamily { name: "DisplayValue", matcher: "TextMatch", options: "MatcherOptions" },
    QueryFamily { name: "LabelText", matcher: "TextMatch", options: "SelectorMatcherOptions" },
    QueryFamily { name: "PlaceholderText", matcher: "TextMatch", options: "MatcherOptions" },
    QueryFamily { name: "Role", matcher: "ByRoleMatcher", options: "ByRoleOptions" },
    QueryFamily { name: "TestId", matcher: "TextMatch", options: "MatcherOptions" },
    QueryFamily { name: "Text", matcher: "TextMatch", options: "SelectorMatcherOptions" },
    QueryFamily { name: "Title", matcher: "TextMatch", options: "MatcherOptions" },
];

/// Query variants as (prefix, result type, waits)
const QUERY_VARIANTS: [(&str, &str, bool); 6] = [
    ("getBy", "IntersectionHTMLElement", false),
    ("getAllBy", "Array<IntersectionHTMLElement>", false),
    ("queryBy", "?IntersectionHTMLElement", false),
    ("queryAllBy", "Array<IntersectionHTMLElement>", false),
    ("findBy", "Promise<IntersectionHTMLElement>", true),
    ("findAllBy", "Promise<Array<IntersectionHTMLElement>>", true),
];

impl QueryFamily {
    /// `(name, signature)` of each variant of this family
    pub fn queries(&self) -> impl Iterator<Item = (String, String)> + '_ {
        QUERY_VARIANTS.iter().map(move |(prefix, result, waits)| {
            let wait = if *waits {
                ", waitForOptions?: WaitForOptions"
            } else {
                ""
            };
            (
                format!("{}{}", prefix, self.name),
                format!(
                    "(id: {}, options?: {}{}) => {}",
                    self.matcher, self.options, wait, result
                ),
            )
        })
    }
}

/// Event helpers exposed as `fireEvent.<name>`
pub const FIRE_EVENTS: &[&str] = &[
    "copy", "cut", "paste", "compositionEnd", "compositionStart", "compositionUpdate",
    "keyDown", "keyPress", "keyUp", "focus", "blur", "focusIn", "focusOut", "change",
    "input", "invalid", "submit", "reset", "click", "contextMenu", "dblClick",
    "doubleClick", "drag", "dragEnd", "dragEnter", "dragExit", "dragLeave", "dragOver",
    "dragStart", "drop", "mouseDown", "mouseEnter", "mouseLeave", "mouseMove", "mouseOut",
    "mouseOver", "mouseUp", "pointerOver", "pointerEnter", "pointerDown", "pointerMove",
    "pointerUp", "pointerCancel", "pointerOut", "pointerLeave", "gotPointerCapture",
    "lostPointerCapture", "select", "touchCancel", "touchEnd", "touchMove", "touchStart",
    "scroll", "wheel", "abort", "canPlay", "canPlayThrough", "durationChange", "emptied",
    "encrypted", "ended", "loadedData", "loadedMetadata", "loadStart", "pause", "play",
    "playing", "progress", "rateChange", "seeked", "seeking", "stalled", "suspend",
    "timeUpdate", "volumeChange", "waiting", "load", "error", "animationStart",
    "animationEnd", "animationIteration", "transitionEnd",
];

/// Accumulates preset declarations written in the type language
#[derive(Default)]
struct Preset {
    catalog: Catalog,
}

impl Preset {
    fn interface(
        &mut self,
        name: &str,
        params: &[&str],
        extends: &[&str],
        members: &[(&str, &str)],
    ) -> Result<&mut Self, CatalogError> {
        let params: Vec<String> = params.iter().map(|p| p.to_string()).collect();
        let extends = extends
            .iter()
            .map(|parent| type_expr(name, parent, &params))
            .collect::<Result<_, _>>()?;
        let members = members
            .iter()
            .map(|(key, ty)| member(name, key, ty, &params))
            .collect::<Result<_, _>>()?;
        self.catalog.declare_type(TypeDecl {
            name: name.to_string(),
            params,
            kind: TypeDeclKind::Interface { extends, members },
        });
        Ok(self)
    }

    fn alias(&mut self, name: &str, params: &[&str], body: &str) -> Result<&mut Self, CatalogError> {
        let params: Vec<String> = params.iter().map(|p| p.to_string()).collect();
        let body = type_expr(name, body, &params)?;
        self.catalog.declare_type(TypeDecl {
            name: name.to_string(),
            params,
            kind: TypeDeclKind::Alias(body),
        });
        Ok(self)
    }

    fn function(&mut self, name: &str, overloads: &[&str]) -> Result<&mut Self, CatalogError> {
        for overload in overloads {
            self.catalog.register(name, signature(name, overload)?)?;
        }
        Ok(self)
    }

    fn constructor(&mut self, name: &str, overload: &str) -> Result<&mut Self, CatalogError> {
        self.catalog
            .declare_constructor(name, signature(name, overload)?)?;
        Ok(self)
    }

    fn value(&mut self, name: &str, ty: &str) -> Result<&mut Self, CatalogError> {
        self.catalog.declare_value(name, type_expr(name, ty, &[])?);
        Ok(self)
    }
}

/// The React testing library surface
pub fn testing_library() -> Result<Catalog, CatalogError> {
    let mut preset = Preset::default();
    dom_types(&mut preset)?;
    react_types(&mut preset)?;
    matcher_types(&mut preset)?;
    library(&mut preset)?;

    let catalog = preset.catalog;
    catalog.validate()?;
    debug!(
        target: "sigconform::preset",
        preset = TESTING_LIBRARY,
        functions = catalog.len(),
        "preset built"
    );
    Ok(catalog)
}

fn dom_types(p: &mut Preset) -> Result<(), CatalogError> {
    p.interface("Node", &[], &[], &[("nodeName", "string"), ("textContent", "string")])?
        .interface(
            "Element",
            &[],
            &["Node"],
            &[
                ("tagName", "string"),
                ("id", "string"),
                ("className", "string"),
                ("getAttribute", "(name: string) => ?string"),
            ],
        )?
        .interface(
            "HTMLElement",
            &[],
            &["Element"],
            &[
                ("title", "string"),
                ("hidden", "boolean"),
                ("click", "() => void"),
                ("focus", "() => void"),
            ],
        )?
        .interface(
            "HTMLInputElement",
            &[],
            &["HTMLElement"],
            &[
                ("value", "string"),
                ("disabled", "boolean"),
                ("checked", "boolean"),
                ("type", "string"),
            ],
        )?
        .interface("HTMLAnchorElement", &[], &["HTMLElement"], &[("href", "string")])?
        .interface("HTMLDivElement", &[], &["HTMLElement"], &[("align", "string")])?
        .alias(
            "IntersectionHTMLElement",
            &[],
            "HTMLElement & HTMLInputElement & HTMLAnchorElement",
        )?
        .interface("DocumentFragment", &[], &["Node"], &[("childElementCount", "number")])?
        .interface(
            "Document",
            &[],
            &["Node"],
            &[
                ("body", "HTMLElement"),
                (
                    "createElement",
                    "((tagName: 'input') => HTMLInputElement) \
                     & ((tagName: 'a') => HTMLAnchorElement) \
                     & ((tagName: 'div') => HTMLDivElement) \
                     & ((tagName: string) => HTMLElement)",
                ),
            ],
        )?
        .interface(
            "Event",
            &[],
            &[],
            &[("type", "string"), ("bubbles", "boolean"), ("cancelable", "boolean")],
        )?
        .interface(
            "MouseEvent",
            &[],
            &["Event"],
            &[("clientX", "number"), ("clientY", "number")],
        )?
        .interface(
            "RegExp",
            &[],
            &[],
            &[("source", "string"), ("test", "(text: string) => boolean")],
        )?
        .interface(
            "Promise",
            &["T"],
            &[],
            &[
                (
                    "then",
                    "<U>(onFulfill?: (value: T) => U, onReject?: (error: any) => U) => Promise<U>",
                ),
                ("catch", "<U>(onReject?: (error: any) => U) => Promise<T | U>"),
                ("finally", "(onFinally?: () => mixed) => Promise<T>"),
            ],
        )?
        .interface(
            "PromiseStatic",
            &[],
            &[],
            &[
                ("resolve", "<T>(value?: T) => Promise<T>"),
                ("reject", "(reason?: mixed) => Promise<any>"),
            ],
        )?
        .alias(
            "Thenable",
            &[],
            "{ then: (resolve: () => mixed, reject?: () => mixed) => mixed, ... }",
        )?
        .constructor(
            "Event",
            "(type: string, init?: { bubbles?: boolean, cancelable?: boolean, ... }) => Event",
        )?
        .constructor(
            "MouseEvent",
            "(type: string, init?: { bubbles?: boolean, cancelable?: boolean, ... }) => MouseEvent",
        )?
        .value("document", "Document")?
        .value("Promise", "PromiseStatic")?;
    Ok(())
}

fn react_types(p: &mut Preset) -> Result<(), CatalogError> {
    p.interface("React.Element", &[], &[], &[("key", "?string")])?
        .interface("React.Component", &["Props"], &[], &[("props", "Props")])?
        .alias("React.ComponentType", &["P"], "Class<React.Component<P>>")?;
    Ok(())
}

fn matcher_types(p: &mut Preset) -> Result<(), CatalogError> {
    p.alias(
        "TextMatch",
        &[],
        "string | RegExp | (content: string, element: ?HTMLElement) => boolean",
    )?
    .alias("ByRoleMatcher", &[], "string")?
    .alias(
        "MatcherOptions",
        &[],
        "{| exact?: boolean, trim?: boolean, collapseWhitespace?: boolean, \
         normalizer?: (text: string) => string |}",
    )?
    .alias(
        "SelectorMatcherOptions",
        &[],
        "{| exact?: boolean, trim?: boolean, collapseWhitespace?: boolean, \
         normalizer?: (text: string) => string, selector?: string, ignore?: string | boolean |}",
    )?
    .alias(
        "ByRoleOptions",
        &[],
        "{| exact?: boolean, hidden?: boolean, name?: TextMatch, description?: TextMatch, \
         selected?: boolean, checked?: boolean, pressed?: boolean, expanded?: boolean, \
         level?: number, queryFallbacks?: boolean, normalizer?: (text: string) => string |}",
    )?
    .alias(
        "WaitForOptions",
        &[],
        "{| container?: HTMLElement, timeout?: number, interval?: number, \
         onTimeout?: (error: mixed) => mixed, mutationObserverOptions?: { ... } |}",
    )?;
    Ok(())
}

fn library(p: &mut Preset) -> Result<(), CatalogError> {
    let queries: Vec<(String, String)> = QUERY_FAMILIES.iter().flat_map(QueryFamily::queries).collect();
    let members: Vec<(&str, &str)> = queries
        .iter()
        .map(|(name, sig)| (name.as_str(), sig.as_str()))
        .collect();
    p.interface("Queries", &[], &[], &members)?;

    let debug = "(baseElement?: HTMLElement | DocumentFragment | Array<HTMLElement | DocumentFragment>, \
                 maxLength?: number, options?: { ... }) => void";
    p.interface(
        "RenderResultBase",
        &[],
        &[],
        &[
            ("container", "HTMLElement"),
            ("baseElement", "HTMLElement"),
            ("debug", debug),
            ("rerender", "(ui: React.Element) => void"),
            ("unmount", "() => boolean"),
            ("asFragment", "() => DocumentFragment"),
        ],
    )?
    .alias("RenderResult", &[], "RenderResultBase & Queries")?
    .interface(
        "Screen",
        &[],
        &["Queries"],
        &[
            ("debug", debug),
            ("logTestingPlaygroundURL", "(element?: HTMLElement) => void"),
        ],
    )?;

    let helpers: Vec<(&str, &str)> = FIRE_EVENTS
        .iter()
        .map(|event| (*event, "(element: HTMLElement, eventProperties?: { ... }) => boolean"))
        .collect();
    p.interface("FireEventHelpers", &[], &[], &helpers)?;

    const RENDER_OPTIONS: &str = "baseElement?: HTMLElement, container?: HTMLElement, \
                                  hydrate?: boolean, legacyRoot?: boolean, \
                                  wrapper?: React.ComponentType<any>";
    let default_render = format!(
        "(ui: React.Element, options?: {{| {} |}}) => RenderResult",
        RENDER_OPTIONS
    );
    let custom_render = format!(
        "<Q>(ui: React.Element, options: {{| {}, queries: Q |}}) => RenderResultBase & Q",
        RENDER_OPTIONS
    );

    p.function("act", &["(callback: () => void | Thenable) => Thenable"])?
        .function("render", &[default_render.as_str(), custom_render.as_str()])?
        .function("cleanup", &["() => void"])?
        .function(
            "waitFor",
            &["<T>(callback: () => T | Promise<T>, options?: WaitForOptions) => Promise<T>"],
        )?
        .function(
            "waitForElementToBeRemoved",
            &[
                "<T: HTMLElement>(callback: () => T, options?: WaitForOptions) => Promise<T>",
                "<T: HTMLElement>(element: T | Array<T>, options?: WaitForOptions) => Promise<T>",
            ],
        )?
        .function("within", &["(element: HTMLElement) => Queries"])?
        .function("getQueriesForElement", &["(element: HTMLElement) => Queries"])?
        .function("getNodeText", &["(node: HTMLElement) => string"])?
        .function("prettyDOM", &["(node?: HTMLElement, maxLength?: number) => string | false"])?
        .value("screen", "Screen")?
        .value(
            "fireEvent",
            "((element: HTMLElement, event: Event) => boolean) & FireEventHelpers",
        )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::subtyping::{MemberLookup, Subtyping};
    use crate::backend::types::{named, TypeExpr};

    #[test]
    fn test_preset_builds_and_validates() {
        let catalog = testing_library().unwrap();
        for name in ["act", "render", "cleanup", "waitFor", "waitForElementToBeRemoved", "within", "getNodeText"] {
            assert!(catalog.has_symbol(name), "missing {}", name);
        }
        assert!(catalog.has_symbol("screen"));
        assert!(catalog.has_symbol("fireEvent"));
        assert!(catalog.has_type("IntersectionHTMLElement"));
        assert_eq!(catalog.lookup("render").unwrap().len(), 2);
        assert_eq!(catalog.lookup("waitForElementToBeRemoved").unwrap().len(), 2);
    }

    #[test]
    fn test_query_template_covers_every_family_and_variant() {
        let catalog = testing_library().unwrap();
        let sub = Subtyping::new(&catalog);
        let screen = named("Screen");
        let mut count = 0;
        for family in QUERY_FAMILIES {
            for (name, _) in family.queries() {
                assert!(
                    matches!(sub.property(&screen, &name), MemberLookup::Found(TypeExpr::Function(_))),
                    "screen lacks {}",
                    name
                );
                count += 1;
            }
        }
        assert_eq!(count, 48);
    }

    #[test]
    fn test_find_queries_take_wait_options() {
        let role = QUERY_FAMILIES[4];
        let queries: Vec<(String, String)> = role.queries().collect();
        assert_eq!(queries[0].0, "getByRole");
        assert_eq!(
            queries[0].1,
            "(id: ByRoleMatcher, options?: ByRoleOptions) => IntersectionHTMLElement"
        );
        assert!(queries[5].1.contains("waitForOptions?: WaitForOptions"));
        assert!(queries[5].1.ends_with("=> Promise<Array<IntersectionHTMLElement>>"));
    }

    #[test]
    fn test_fire_event_is_callable_with_helpers() {
        let catalog = testing_library().unwrap();
        let Some(TypeExpr::Intersection(parts)) = catalog.value_type("fireEvent") else {
            panic!("expected intersection");
        };
        assert!(matches!(parts[0], TypeExpr::Function(_)));
        let sub = Subtyping::new(&catalog);
        let fire = TypeExpr::Intersection(parts);
        for event in FIRE_EVENTS {
            assert!(matches!(sub.property(&fire, event), MemberLookup::Found(_)));
        }
    }

    #[test]
    fn test_unknown_preset() {
        assert!(load("jest-dom").is_err());
        assert!(load(TESTING_LIBRARY).is_ok());
    }
}
