//! Short component names for the terminal table.
//!
//! Retailer titles carry marketing text, pin counts, SKUs and feature lists.
//! These helpers cut a title down to the part a reader compares.

use regex::Regex;
use std::sync::OnceLock;

struct DisplayPatterns {
    cpu_sku: Regex,
    ram_desktop: Regex,
    ram_gaming: Regex,
    ram_pins: Regex,
    ram_bandwidth: Regex,
    ram_model: Regex,
    ram_latency: Regex,
    ram_platform: Regex,
    ram_series: Regex,
    ram_kit: Regex,
    board_with: Regex,
    board_suffix: Regex,
    board_trailing: [Regex; 6],
}

fn patterns() -> &'static DisplayPatterns {
    static PATTERNS: OnceLock<DisplayPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let re = |pattern: &str| Regex::new(pattern).expect("valid regex");
        DisplayPatterns {
            cpu_sku: re(r"\s+\d{3}-\d{9,}\w*$"),
            ram_desktop: re(r"(?i)\s+Desktop\s+(?:Memory|Upgrade)\b"),
            ram_gaming: re(r"(?i)\s+Gaming\s+Desktop\b"),
            ram_pins: re(r"\s*288-Pin\s+PC\s*(?:RAM)?\s*"),
            ram_bandwidth: re(r"\s*\(PC\d\s+\d+\)"),
            ram_model: re(r"\s+(?:Model\s+)?[A-Z0-9]{10,}\w*$"),
            ram_latency: re(r"(?i)(\d{4,5}\s*MHz)\s+CL\d.*$"),
            ram_platform: re(r"(?i),?\s+for\s+(?:AMD|Intel)\b.*$"),
            ram_series: re(r"\s+Series\s*$"),
            ram_kit: re(r"(\d+)\s*x\s*(\d+GB)"),
            board_with: re(r"\s+with\s+\d"),
            board_suffix: re(
                r"\s+(?:(?:Micro[- ]?|Extended\s+|E-)?ATX\s+)?(?:[Mm]otherboard|[Mm]ainboard)\s*$",
            ),
            board_trailing: [
                re(r"(?i)\s+(?:AMD\s+)?(?:AM\d|LGA\s*\d{4})\s*$"),
                re(r"(?i)\s+AMD\s+(?:X\d{3}\w?|B\d{3}\w?)\s*$"),
                re(r"(?i)\s+(?:E-|Extended\s*|Micro[- ]?)?ATX\s*$"),
                re(r"(?i)\s+Ultra\s+Core\s*(?:\(Series\s*\d\))?\s*$"),
                re(r"(?i)\s*\(Series\s*\d\)\s*$"),
                re(r"(?i)\s+AMD\s+RYZEN\s+\d{4}\s*$"),
            ],
        }
    })
}

/// Text before the first match of `re`, or all of `text`.
fn before<'a>(re: &Regex, text: &'a str) -> &'a str {
    re.find(text).map_or(text, |m| &text[..m.start()])
}

fn strip(re: &Regex, text: &str, with: &str) -> String {
    re.replace_all(text, with).into_owned()
}

/// Model identifier of a CPU title: `"Intel Core i7-14700K - 14th Gen ..."`
/// becomes `"Intel Core i7-14700K"`.
pub fn shorten_cpu(name: &str) -> String {
    let short = name.split(" - ").next().unwrap_or(name).trim();
    patterns().cpu_sku.replace(short, "").into_owned()
}

/// Brand, line, capacity and speed of a RAM title.
pub fn shorten_ram(name: &str) -> String {
    let p = patterns();
    let short = before(&p.ram_gaming, before(&p.ram_desktop, name));
    let short = strip(&p.ram_pins, short, " ");
    let short = strip(&p.ram_bandwidth, &short, "");
    let short = strip(&p.ram_model, &short, "");
    let short = strip(&p.ram_latency, &short, "${1}");
    let short = strip(&p.ram_platform, &short, "");
    let short = strip(&p.ram_series, &short, "");
    let short = strip(&p.ram_kit, &short, "${1}x${2}");
    short.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Brand and model of a motherboard title, without socket, chipset family,
/// form factor or feature list.
pub fn shorten_motherboard(name: &str) -> String {
    let p = patterns();
    let short = name.split(',').next().unwrap_or(name).trim();
    let short = before(&p.board_with, short).trim();
    let mut short = p.board_suffix.replace(short, "").into_owned();
    // Noise stacks up ("AMD AM5 LGA 1718"), so peel a few layers.
    for _ in 0..4 {
        for re in &p.board_trailing {
            short = re.replace(&short, "").into_owned();
        }
    }
    short.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_titles() {
        assert_eq!(
            shorten_cpu("AMD Ryzen 7 9850X3D - Ryzen 7 9000 Series 8-Core 5.6GHz Socket AM5 120W"),
            "AMD Ryzen 7 9850X3D"
        );
        assert_eq!(
            shorten_cpu("Intel Core i7-14700K - 14th Gen Raptor Lake 20-Core LGA 1700"),
            "Intel Core i7-14700K"
        );
        assert_eq!(shorten_cpu("AMD Ryzen 5 7600 100-100001015BOX"), "AMD Ryzen 5 7600");
        assert_eq!(shorten_cpu(""), "");
    }

    #[test]
    fn ram_titles() {
        assert_eq!(
            shorten_ram(
                "CORSAIR Vengeance RGB 32GB (2 x 16GB) 288-Pin PC RAM DDR5 6400 (PC5 51200) \
                 Desktop Memory Model CMH32GX5M2N6400C36"
            ),
            "CORSAIR Vengeance RGB 32GB (2x16GB) DDR5 6400"
        );
        assert_eq!(
            shorten_ram("G.SKILL Flare X5 32GB DDR5 6000MHz CL30-36-36-96 1.35V, for AMD EXPO"),
            "G.SKILL Flare X5 32GB DDR5 6000MHz"
        );
        assert_eq!(shorten_ram("Kingston FURY Beast 32GB Gaming Desktop RAM"), "Kingston FURY Beast 32GB");
    }

    #[test]
    fn motherboard_titles() {
        assert_eq!(
            shorten_motherboard(
                "ASUS TUF GAMING X870E-PLUS WIFI7 AMD X870E ATX Motherboard with 16+2+1 80A Power \
                 Stages, DDR5 Support"
            ),
            "ASUS TUF GAMING X870E-PLUS WIFI7"
        );
        assert_eq!(
            shorten_motherboard(
                "GIGABYTE B850 GAMING X WIFI6E AMD AM5 LGA 1718 Motherboard, ATX, DDR5, 3x M.2"
            ),
            "GIGABYTE B850 GAMING X WIFI6E"
        );
        assert_eq!(
            shorten_motherboard("ASUS ROG STRIX Z890-E GAMING WIFI LGA 1851 ATX Ultra Core (Series 2)"),
            "ASUS ROG STRIX Z890-E GAMING WIFI"
        );
    }

    #[test]
    fn short_names_pass_through() {
        assert_eq!(shorten_cpu("Ryzen 7 9700X"), "Ryzen 7 9700X");
        assert_eq!(shorten_ram("32GB DDR5-6000"), "32GB DDR5-6000");
        assert_eq!(shorten_motherboard("ASUS PRIME B650-PLUS"), "ASUS PRIME B650-PLUS");
    }
}
