//! Paged key/object help.
//!
//! The help tables are larger than the screen, so `?` cycles through them
//! one page at a time, wrapping back to the start. Each page opens with
//! its section header and stops early at the next one.

struct Entry {
    header: bool,
    desc: &'static str,
    keys: &'static str,
}

const fn header(desc: &'static str, keys: &'static str) -> Entry {
    Entry {
        header: true,
        desc,
        keys,
    }
}

const fn entry(desc: &'static str, keys: &'static str) -> Entry {
    Entry {
        header: false,
        desc,
        keys,
    }
}

const HELP: &[Entry] = &[
    header("Object Identifiers", "On Screen"),
    entry("Walls", "- | +"),
    entry("Diagonal (deflecting) walls", "/ \\"),
    entry("Doors (dispersion walls)", "#"),
    entry("Small mine", ";"),
    entry("Large mine", "g"),
    entry("Bullet", ":"),
    entry("Grenade", "o"),
    entry("Satchel charge", "O"),
    entry("Bomb", "@"),
    entry("Small slime", "s"),
    entry("Big slime", "$"),
    entry("Me", "> < ^ v"),
    entry("Other players", "} { i !"),
    entry("Explosion", "*"),
    entry("Grenade & large mine explosion", "\\|/ -*- /|\\"),
    header("Player Commands", "Key"),
    entry("Move up / down / left / right", "k j h l"),
    entry("Face up / down / left / right", "K J H L"),
    entry("Fire a bullet (1 charge)", "f or 1"),
    entry("Throw grenade (9 charges)", "g or 2"),
    entry("Throw satchel charge (25 charges)", "F or 3"),
    entry("Throw bomb (49 charges)", "G or 4"),
    entry("Throw bigger bombs (81..441 charges)", "5 6 7 8 9 0 @"),
    entry("Throw small / big slime (5, 10 charges)", "o O"),
    entry("Throw bigger slime (15, 20 charges)", "p P"),
    entry("Scan (show other players, 1 charge)", "s"),
    entry("Cloak (hide from scanners, 1 charge)", "c"),
    header("Game Commands", "Key"),
    entry("Redraw screen", "ctrl-l"),
    entry("Quit game / exit client", "q"),
    entry("Disable sound", "-"),
    entry("Enable sound", "+"),
    entry("Join a game", "ctrl-j"),
    entry("Show statistics", "$"),
    entry("Message other players", "ctrl-m"),
    entry("Next page of help", "?"),
];

/// Cycles through the help tables one screenful at a time.
#[derive(Debug, Default)]
pub struct HelpPager {
    start: usize,
}

impl HelpPager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the next page with at most `lines` rows, advancing the pager.
    pub fn next_page(&mut self, lines: usize) -> String {
        if self.start >= HELP.len() {
            self.start = 0;
        }

        let mut page = String::new();

        // every page opens with its section header
        if !HELP[self.start].header {
            if let Some(h) = HELP[..self.start].iter().rev().find(|e| e.header) {
                push_line(&mut page, h);
            }
        }

        let mut taken = 0;
        for (i, e) in HELP[self.start..].iter().enumerate() {
            if taken >= lines || (e.header && i > 0) {
                break;
            }
            push_line(&mut page, e);
            taken += 1;
        }

        self.start += taken.max(1);
        page
    }
}

fn push_line(page: &mut String, e: &Entry) {
    if e.header {
        page.push_str(&format!("== {} / {} ==\n", e.desc, e.keys));
    } else {
        page.push_str(&format!("{:<44}{}\n", e.desc, e.keys));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_page_starts_with_header() {
        let mut pager = HelpPager::new();
        let page = pager.next_page(19);
        assert!(page.starts_with("== Object Identifiers"));
        assert!(page.lines().count() <= 19);
    }

    #[test]
    fn test_pages_stop_at_section_boundaries() {
        let mut pager = HelpPager::new();
        let first = pager.next_page(100);
        // a page never runs into the next section even with room to spare
        assert_eq!(first.matches("==").count(), 2); // one header, open+close markers
        let second = pager.next_page(100);
        assert!(second.starts_with("== Player Commands"));
    }

    #[test]
    fn test_pager_wraps_around() {
        let mut pager = HelpPager::new();
        let first = pager.next_page(19);
        for _ in 0..16 {
            pager.next_page(19);
        }
        // enough paging must come back to the first page eventually
        let mut wrapped = pager.next_page(19);
        for _ in 0..16 {
            if wrapped == first {
                break;
            }
            wrapped = pager.next_page(19);
        }
        assert_eq!(wrapped, first);
    }

    #[test]
    fn test_mid_section_page_repeats_header() {
        let mut pager = HelpPager::new();
        pager.next_page(4); // partway into the first section
        let page = pager.next_page(4);
        assert!(page.starts_with("== Object Identifiers"));
    }
}
