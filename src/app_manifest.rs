//! Application manifest resource.
//!
//! [`AppManifest`] describes the settings most executables need and renders them as the XML stored in `RT_MANIFEST` resources.
//! Reading XML back only looks at the elements this descriptor produces, anything else in the document is ignored.
//! See <https://learn.microsoft.com/en-us/windows/win32/sbscs/application-manifests> for more information.

use log::trace;
use serde::{Deserialize, Serialize};

use crate::errors::*;

const NS_ASM_V1: &str = "urn:schemas-microsoft-com:asm.v1";
const NS_ASM_V3: &str = "urn:schemas-microsoft-com:asm.v3";
const NS_COMPATIBILITY_V1: &str = "urn:schemas-microsoft-com:compatibility.v1";
const NS_SETTINGS_2005: &str = "http://schemas.microsoft.com/SMI/2005/WindowsSettings";
const NS_SETTINGS_2011: &str = "http://schemas.microsoft.com/SMI/2011/WindowsSettings";
const NS_SETTINGS_2013: &str = "http://schemas.microsoft.com/SMI/2013/WindowsSettings";
const NS_SETTINGS_2016: &str = "http://schemas.microsoft.com/SMI/2016/WindowsSettings";
const NS_SETTINGS_2017: &str = "http://schemas.microsoft.com/SMI/2017/WindowsSettings";
const NS_SETTINGS_2020: &str = "http://schemas.microsoft.com/SMI/2020/WindowsSettings";

const COMMON_CONTROLS_NAME: &str = "Microsoft.Windows.Common-Controls";

/// Assembly identity of the application.
#[derive(Debug, Clone, Eq, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyIdentity {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name:    String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,
}

/// Oldest supported operating system.
/// Every newer system is declared as supported as well.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Default, Serialize, Deserialize)]
pub enum MinimumOs {
    #[default]
    #[serde(rename = "vista")]
    Vista,
    #[serde(rename = "win7")]
    Win7,
    #[serde(rename = "win8")]
    Win8,
    #[serde(rename = "win8.1")]
    Win81,
    #[serde(rename = "win10")]
    Win10,
}

static SUPPORTED_OS: [(MinimumOs, &str); 5] = [
    (MinimumOs::Vista, "{e2011457-1546-43c5-a5fe-008deee3d3f0}"),
    (MinimumOs::Win7, "{35138b9a-5d96-4fbd-8e2d-a2440225f93a}"),
    (MinimumOs::Win8, "{4a2f28e3-53b9-4441-ba9c-d69d4a4a6e38}"),
    (MinimumOs::Win81, "{1f676c76-80e1-4239-95bb-83d0f6d0da78}"),
    (MinimumOs::Win10, "{8e0f7a12-bfb3-4fe8-b9a5-48fd50a15a9a}"),
];

/// Requested execution level.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default, Serialize, Deserialize)]
pub enum ExecutionLevel {
    /// No trust information.
    #[default]
    #[serde(rename = "")]
    None,
    #[serde(rename = "as invoker")]
    AsInvoker,
    #[serde(rename = "highest")]
    Highest,
    #[serde(rename = "administrator")]
    Administrator,
}
impl ExecutionLevel {
    fn level(&self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::AsInvoker => Some("asInvoker"),
            Self::Highest => Some("highestAvailable"),
            Self::Administrator => Some("requireAdministrator"),
        }
    }
}

/// DPI awareness of the application.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default, Serialize, Deserialize)]
pub enum DpiAwareness {
    #[serde(rename = "unaware")]
    Unaware,
    #[default]
    #[serde(rename = "system")]
    System,
    #[serde(rename = "per monitor")]
    PerMonitor,
    #[serde(rename = "per monitor v2")]
    PerMonitorV2,
}

/// Application manifest descriptor.
#[derive(Debug, Clone, Eq, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct AppManifest {
    pub identity:                              AssemblyIdentity,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description:                           String,
    pub minimum_os:                            MinimumOs,
    pub execution_level:                       ExecutionLevel,
    pub ui_access:                             bool,
    pub auto_elevate:                          bool,
    pub dpi_awareness:                         DpiAwareness,
    pub disable_theming:                       bool,
    pub disable_window_filtering:              bool,
    pub high_resolution_scrolling_aware:       bool,
    pub ultra_high_resolution_scrolling_aware: bool,
    pub long_path_aware:                       bool,
    pub printer_driver_isolation:              bool,
    pub gdi_scaling:                           bool,
    pub segment_heap:                          bool,
    pub use_common_controls_v6:                bool,
}
impl AppManifest {
    /// Render the manifest as an XML document.
    pub fn to_xml(&self) -> Vec<u8> {
        let mut xml = String::new();
        xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n");
        xml.push_str(&format!("<assembly xmlns=\"{}\" manifestVersion=\"1.0\">\n", NS_ASM_V1));

        if !self.identity.name.is_empty() {
            xml.push_str(&format!(
                "  <assemblyIdentity type=\"win32\" name=\"{}\" version=\"{}\" processorArchitecture=\"*\"/>\n",
                escape(&self.identity.name),
                escape(if self.identity.version.is_empty() { "0.0.0.0" } else { &self.identity.version })
            ));
        }
        if !self.description.is_empty() {
            xml.push_str(&format!("  <description>{}</description>\n", escape(&self.description)));
        }

        xml.push_str(&format!("  <compatibility xmlns=\"{}\">\n", NS_COMPATIBILITY_V1));
        xml.push_str("    <application>\n");
        for (_, id) in SUPPORTED_OS.iter().filter(|(os, _)| *os >= self.minimum_os) {
            xml.push_str(&format!("      <supportedOS Id=\"{}\"/>\n", id));
        }
        xml.push_str("    </application>\n");
        xml.push_str("  </compatibility>\n");

        xml.push_str(&format!("  <application xmlns=\"{}\">\n", NS_ASM_V3));
        xml.push_str("    <windowsSettings>\n");
        let (dpi_aware, dpi_awareness) = match self.dpi_awareness {
            DpiAwareness::Unaware => ("false", None),
            DpiAwareness::System => ("true", None),
            DpiAwareness::PerMonitor => ("true/pm", Some("permonitor")),
            DpiAwareness::PerMonitorV2 => ("true/pm", Some("permonitorv2,permonitor")),
        };
        setting(&mut xml, "dpiAware", NS_SETTINGS_2005, dpi_aware);
        if let Some(dpi_awareness) = dpi_awareness {
            setting(&mut xml, "dpiAwareness", NS_SETTINGS_2016, dpi_awareness);
        }
        let flags = [
            (self.auto_elevate, "autoElevate", NS_SETTINGS_2005),
            (self.disable_theming, "disableTheming", NS_SETTINGS_2005),
            (self.disable_window_filtering, "disableWindowFiltering", NS_SETTINGS_2011),
            (self.high_resolution_scrolling_aware, "highResolutionScrollingAware", NS_SETTINGS_2013),
            (
                self.ultra_high_resolution_scrolling_aware,
                "ultraHighResolutionScrollingAware",
                NS_SETTINGS_2013,
            ),
            (self.long_path_aware, "longPathAware", NS_SETTINGS_2016),
            (self.printer_driver_isolation, "printerDriverIsolation", NS_SETTINGS_2011),
            (self.gdi_scaling, "gdiScaling", NS_SETTINGS_2017),
        ];
        for (_, name, namespace) in flags.iter().filter(|(enabled, ..)| *enabled) {
            setting(&mut xml, name, namespace, "true");
        }
        if self.segment_heap {
            setting(&mut xml, "heapType", NS_SETTINGS_2020, "SegmentHeap");
        }
        xml.push_str("    </windowsSettings>\n");
        xml.push_str("  </application>\n");

        if let Some(level) = self.execution_level.level() {
            xml.push_str(&format!("  <trustInfo xmlns=\"{}\">\n", NS_ASM_V3));
            xml.push_str("    <security>\n");
            xml.push_str("      <requestedPrivileges>\n");
            xml.push_str(&format!(
                "        <requestedExecutionLevel level=\"{}\" uiAccess=\"{}\"/>\n",
                level, self.ui_access
            ));
            xml.push_str("      </requestedPrivileges>\n");
            xml.push_str("    </security>\n");
            xml.push_str("  </trustInfo>\n");
        }

        if self.use_common_controls_v6 {
            xml.push_str("  <dependency>\n");
            xml.push_str("    <dependentAssembly>\n");
            xml.push_str(&format!(
                "      <assemblyIdentity type=\"win32\" name=\"{}\" version=\"6.0.0.0\" processorArchitecture=\"*\" publicKeyToken=\"6595b64144ccf1df\" language=\"*\"/>\n",
                COMMON_CONTROLS_NAME
            ));
            xml.push_str("    </dependentAssembly>\n");
            xml.push_str("  </dependency>\n");
        }

        xml.push_str("</assembly>\n");
        xml.into_bytes()
    }

    /// Read a manifest from an XML document.
    ///
    /// # Returns
    /// Returns an error if the data is not UTF-8, is not well-formed or has no `assembly` root element.
    pub fn from_xml(data: &[u8]) -> Result<Self, ResourceError> {
        let xml = std::str::from_utf8(data)
            .map_err(|e| ResourceError::InvalidManifest(e.to_string()))?
            .trim_start_matches('\u{feff}');
        let root = Element::parse(xml).map_err(ResourceError::InvalidManifest)?;
        let assembly = root
            .child("assembly")
            .ok_or_else(|| ResourceError::InvalidManifest("no assembly element".into()))?;

        let mut manifest = Self {
            dpi_awareness: DpiAwareness::Unaware,
            ..Default::default()
        };

        if let Some(identity) = assembly.child("assemblyIdentity") {
            manifest.identity.name = identity.attribute("name").unwrap_or_default().to_string();
            manifest.identity.version = identity.attribute("version").unwrap_or_default().to_string();
        }
        if let Some(description) = assembly.child("description") {
            manifest.description = description.text.trim().to_string();
        }

        if let Some(application) = assembly.path(&["compatibility", "application"]) {
            manifest.minimum_os = application
                .children("supportedOS")
                .filter_map(|os| os.attribute("Id"))
                .filter_map(|id| {
                    SUPPORTED_OS.iter().find(|(_, known)| known.eq_ignore_ascii_case(id.trim()))
                })
                .map(|(os, _)| *os)
                .min()
                .unwrap_or_default();
        }

        for settings in assembly
            .children("application")
            .filter_map(|application| application.child("windowsSettings"))
        {
            for option in &settings.children {
                let value = option.text.trim();
                let enabled = value.eq_ignore_ascii_case("true");
                trace!("manifest setting {} = {:?}", option.name, value);
                match option.name.as_str() {
                    "dpiAware" => {
                        // dpiAwareness takes precedence when present
                        if settings.child("dpiAwareness").is_none() {
                            manifest.dpi_awareness = match value.to_ascii_lowercase().as_str() {
                                "true" => DpiAwareness::System,
                                "true/pm" | "per monitor" => DpiAwareness::PerMonitor,
                                _ => DpiAwareness::Unaware,
                            };
                        }
                    }
                    "dpiAwareness" => {
                        let first = value.split(',').next().unwrap_or_default().trim();
                        manifest.dpi_awareness = match first.to_ascii_lowercase().as_str() {
                            "permonitorv2" => DpiAwareness::PerMonitorV2,
                            "permonitor" => DpiAwareness::PerMonitor,
                            "system" => DpiAwareness::System,
                            _ => DpiAwareness::Unaware,
                        };
                    }
                    "autoElevate" => manifest.auto_elevate = enabled,
                    "disableTheming" => manifest.disable_theming = enabled,
                    "disableWindowFiltering" => manifest.disable_window_filtering = enabled,
                    "highResolutionScrollingAware" => {
                        manifest.high_resolution_scrolling_aware = enabled
                    }
                    "ultraHighResolutionScrollingAware" => {
                        manifest.ultra_high_resolution_scrolling_aware = enabled
                    }
                    "longPathAware" => manifest.long_path_aware = enabled,
                    "printerDriverIsolation" => manifest.printer_driver_isolation = enabled,
                    "gdiScaling" => manifest.gdi_scaling = enabled,
                    "heapType" => manifest.segment_heap = value.eq_ignore_ascii_case("SegmentHeap"),
                    _ => {}
                }
            }
        }

        if let Some(level) =
            assembly.path(&["trustInfo", "security", "requestedPrivileges", "requestedExecutionLevel"])
        {
            manifest.execution_level = match level.attribute("level").unwrap_or_default() {
                "asInvoker" => ExecutionLevel::AsInvoker,
                "highestAvailable" => ExecutionLevel::Highest,
                "requireAdministrator" => ExecutionLevel::Administrator,
                _ => ExecutionLevel::None,
            };
            manifest.ui_access = level
                .attribute("uiAccess")
                .is_some_and(|value| value.eq_ignore_ascii_case("true"));
        }

        manifest.use_common_controls_v6 = assembly
            .children("dependency")
            .filter_map(|dependency| dependency.path(&["dependentAssembly", "assemblyIdentity"]))
            .any(|identity| {
                identity
                    .attribute("name")
                    .is_some_and(|name| name.eq_ignore_ascii_case(COMMON_CONTROLS_NAME))
            });

        Ok(manifest)
    }
}

fn setting(xml: &mut String, name: &str, namespace: &str, value: &str) {
    xml.push_str(&format!("      <{0} xmlns=\"{1}\">{2}</{0}>\n", name, namespace, value));
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn unescape(text: &str) -> Result<String, String> {
    let mut unescaped = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('&') {
        unescaped.push_str(&rest[..start]);
        let end = rest[start..]
            .find(';')
            .ok_or_else(|| format!("unterminated entity in {:?}", text))?;
        let entity = &rest[start + 1..start + end];
        let c = match entity {
            "amp" => '&',
            "lt" => '<',
            "gt" => '>',
            "quot" => '"',
            "apos" => '\'',
            _ => entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
                .map(|hex| u32::from_str_radix(hex, 16))
                .or_else(|| entity.strip_prefix('#').map(|dec| dec.parse::<u32>()))
                .and_then(|code| code.ok())
                .and_then(char::from_u32)
                .ok_or_else(|| format!("unknown entity &{};", entity))?,
        };
        unescaped.push(c);
        rest = &rest[start + end + 1..];
    }
    unescaped.push_str(rest);
    Ok(unescaped)
}

/// Element of a parsed XML document, with namespace prefixes removed from names.
#[derive(Debug, Default)]
struct Element {
    name:       String,
    attributes: Vec<(String, String)>,
    text:       String,
    children:   Vec<Element>,
}
impl Element {
    /// Parse a document into an unnamed element holding the top-level elements.
    fn parse(xml: &str) -> Result<Self, String> {
        let mut stack = vec![Element::default()];
        let mut rest = xml;
        while let Some(start) = rest.find('<') {
            let text = &rest[..start];
            if let Some(current) = stack.last_mut() {
                current.text.push_str(&unescape(text)?);
            }
            rest = &rest[start..];

            if let Some(comment) = rest.strip_prefix("<!--") {
                let end = comment.find("-->").ok_or("unterminated comment")?;
                rest = &comment[end + 3..];
                continue;
            }
            if let Some(cdata) = rest.strip_prefix("<![CDATA[") {
                let end = cdata.find("]]>").ok_or("unterminated cdata")?;
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&cdata[..end]);
                }
                rest = &cdata[end + 3..];
                continue;
            }

            let end = tag_end(rest).ok_or("unterminated tag")?;
            let tag = &rest[1..end];
            rest = &rest[end + 1..];

            if tag.starts_with('?') || tag.starts_with('!') {
                continue;
            }
            if let Some(name) = tag.strip_prefix('/') {
                let element = stack.pop().ok_or("unbalanced end tag")?;
                if element.name != local_name(name.trim()) || stack.is_empty() {
                    return Err(format!("unexpected end tag {:?}", name.trim()));
                }
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(element);
                }
                continue;
            }

            let (tag, empty) = match tag.strip_suffix('/') {
                Some(tag) => (tag, true),
                None => (tag, false),
            };
            let element = Self::start_tag(tag)?;
            if empty {
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(element);
                }
            } else {
                stack.push(element);
            }
        }

        if stack.len() != 1 {
            return Err("unclosed element".into());
        }
        stack.pop().ok_or_else(|| "empty document".into())
    }

    fn start_tag(tag: &str) -> Result<Self, String> {
        let tag = tag.trim();
        let name_end = tag.find(char::is_whitespace).unwrap_or(tag.len());
        let mut element = Element {
            name: local_name(&tag[..name_end]).to_string(),
            ..Default::default()
        };
        let mut rest = tag[name_end..].trim_start();
        while !rest.is_empty() {
            let equals = rest.find('=').ok_or_else(|| format!("invalid attribute in {:?}", tag))?;
            let name = rest[..equals].trim();
            let value = rest[equals + 1..].trim_start();
            let quote = value
                .chars()
                .next()
                .filter(|&c| c == '"' || c == '\'')
                .ok_or_else(|| format!("unquoted attribute {:?}", name))?;
            let value = &value[1..];
            let end = value.find(quote).ok_or_else(|| format!("unterminated attribute {:?}", name))?;
            element.attributes.push((local_name(name).to_string(), unescape(&value[..end])?));
            rest = value[end + 1..].trim_start();
        }
        Ok(element)
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.iter().find(|(key, _)| key == name).map(|(_, value)| value.as_str())
    }

    fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|child| child.name == name)
    }

    fn children<'a>(&'a self, name: &'static str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |child| child.name == name)
    }

    fn path(&self, names: &[&str]) -> Option<&Element> {
        names.iter().try_fold(self, |element, name| element.child(name))
    }
}

/// Returns the index of the `>` closing the tag at the start of `xml`, skipping quoted attribute values.
fn tag_end(xml: &str) -> Option<usize> {
    let mut quote = None;
    for (index, c) in xml.char_indices() {
        match (quote, c) {
            (None, '"' | '\'') => quote = Some(c),
            (Some(q), c) if c == q => quote = None,
            (None, '>') => return Some(index),
            _ => {}
        }
    }
    None
}

fn local_name(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}
