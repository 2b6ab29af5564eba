// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! The fixed layout of mono output buses, one per microphone.

/// Number of mono output buses rendered on every block.
pub const NUM_OUTPUT_BUSES: usize = 15;

/// Human readable bus names, indexed by bus.
/// Stereo microphones occupy two adjacent buses (left, then right).
pub const BUS_NAMES: [&str; NUM_OUTPUT_BUSES] = [
    "Kick In",
    "Kick Out",
    "Snare Top",
    "Snare Bottom",
    "HiHat",
    "Racktom 1",
    "Racktom 2",
    "Racktom 3",
    "Floortom 1",
    "Floortom 2",
    "Floortom 3",
    "Overhead L",
    "Overhead R",
    "Room L",
    "Room R",
];

/// Looks up a bus by name (case-insensitive, spaces, dashes and underscores are
/// interchangeable) or by numeric index.
pub fn bus_index(name: &str) -> Option<usize> {
    if let Ok(index) = name.trim().parse::<usize>() {
        return (index < NUM_OUTPUT_BUSES).then_some(index);
    }
    let wanted = normalize(name);
    BUS_NAMES.iter().position(|bus| normalize(bus) == wanted)
}

/// A filesystem friendly name for the bus, e.g. `07-racktom-3`.
pub fn bus_file_stem(index: usize) -> String {
    let name = BUS_NAMES.get(index).copied().unwrap_or("bus");
    format!("{:02}-{}", index, normalize(name).replace(' ', "-"))
}

fn normalize(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            '_' | '-' => ' ',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bus_index_by_name() {
        assert_eq!(bus_index("Kick In"), Some(0));
        assert_eq!(bus_index("overhead_l"), Some(11));
        assert_eq!(bus_index("room-r"), Some(14));
        assert_eq!(bus_index("cowbell"), None);
    }

    #[test]
    fn test_bus_index_by_number() {
        assert_eq!(bus_index("4"), Some(4));
        assert_eq!(bus_index("15"), None);
    }

    #[test]
    fn test_bus_file_stem() {
        assert_eq!(bus_file_stem(0), "00-kick-in");
        assert_eq!(bus_file_stem(12), "12-overhead-r");
    }
}
