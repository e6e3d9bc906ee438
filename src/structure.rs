//! Owned structure model: chains, residues and atoms with 3D coordinates.
//!
//! Structures are converted from the parser representation once at load
//! time (see [`crate::utils::load_structure`]) and the whole pipeline
//! operates on these types: renumbering and residue deletion during
//! alignment mapping mutate a private copy of the model in place.

use nalgebra as na;

/// A named atom with its coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// PDB atom name, e.g. "CA", "C", "N", "O", "CB".
    pub name: String,
    /// Position in Ångström.
    pub coord: na::Point3<f64>,
}

impl Atom {
    /// Build an atom from a name and coordinate triple.
    pub fn new(name: &str, x: f64, y: f64, z: f64) -> Self {
        Self {
            name: name.to_string(),
            coord: na::Point3::new(x, y, z),
        }
    }
}

/// One amino-acid residue.
#[derive(Debug, Clone, PartialEq)]
pub struct Residue {
    /// Sequence position; rewritten to native numbering by the alignment
    /// mapper.
    pub number: isize,
    /// Three-letter residue name, e.g. "ALA".
    pub name: String,
    /// Atoms in file order.
    pub atoms: Vec<Atom>,
}

impl Residue {
    /// The residue one-letter code, or `None` if it's not an amino acid.
    pub fn one_letter(&self) -> Option<char> {
        match self.name.to_uppercase().as_str() {
            "ALA" => Some('A'),
            "ARG" => Some('R'),
            "ASN" => Some('N'),
            "ASP" => Some('D'),
            "CYS" => Some('C'),
            "GLN" => Some('Q'),
            "GLU" => Some('E'),
            "GLY" => Some('G'),
            "HIS" => Some('H'),
            "ILE" => Some('I'),
            "LEU" => Some('L'),
            "LYS" => Some('K'),
            "MET" => Some('M'),
            "PHE" => Some('F'),
            "PRO" => Some('P'),
            "SER" => Some('S'),
            "THR" => Some('T'),
            "TRP" => Some('W'),
            "TYR" => Some('Y'),
            "VAL" => Some('V'),
            _ => None,
        }
    }

    /// Look up an atom by name.
    pub fn atom(&self, name: &str) -> Option<&Atom> {
        self.atoms.iter().find(|a| a.name == name)
    }

    /// The residue's representative atom for single-atom distance modes:
    /// CB if present, CA otherwise (glycine has no CB).
    pub fn representative_atom(&self) -> Option<&Atom> {
        self.atom("CB").or_else(|| self.atom("CA"))
    }
}

/// An ordered run of residues sharing one chain id.
#[derive(Debug, Clone, PartialEq)]
pub struct Chain {
    /// Chain id as it appears in the file.
    pub id: String,
    /// Residues in file order.
    pub residues: Vec<Residue>,
}

impl Chain {
    /// The chain's amino-acid sequence as one-letter codes.
    ///
    /// Residues without a known one-letter code never make it past the
    /// loader, so this is total for loaded structures.
    pub fn sequence(&self) -> String {
        self.residues
            .iter()
            .filter_map(|res| res.one_letter())
            .collect()
    }

    /// Residue numbers in chain order.
    pub fn numbering(&self) -> Vec<isize> {
        self.residues.iter().map(|res| res.number).collect()
    }
}

/// An ordered collection of chains, one per physical chain id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Structure {
    /// Chains in file order.
    pub chains: Vec<Chain>,
}

impl Structure {
    /// All chain ids in file order.
    pub fn chain_ids(&self) -> Vec<String> {
        self.chains.iter().map(|c| c.id.clone()).collect()
    }

    /// Look up a chain by id.
    pub fn chain(&self, id: &str) -> Option<&Chain> {
        self.chains.iter().find(|c| c.id == id)
    }

    /// Mutable chain lookup.
    pub fn chain_mut(&mut self, id: &str) -> Option<&mut Chain> {
        self.chains.iter_mut().find(|c| c.id == id)
    }

    /// Drop every chain whose id is not in `keep`.
    pub fn retain_chains(&mut self, keep: &[String]) {
        self.chains.retain(|c| keep.contains(&c.id));
    }
}

/// An ordered set of chain ids forming one docking partner.
///
/// Model-side and native-side groups are independent but positionally
/// correlated: the i-th model chain corresponds to the i-th native chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainGroup {
    /// Chain ids, in correspondence order.
    pub chains: Vec<String>,
}

impl ChainGroup {
    /// Build a group from chain ids.
    pub fn new<I, S>(chains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            chains: chains.into_iter().map(Into::into).collect(),
        }
    }

    /// The group's residues in chain-then-residue order.
    pub fn residues<'a>(&self, structure: &'a Structure) -> Vec<&'a Residue> {
        self.chains
            .iter()
            .filter_map(|id| structure.chain(id))
            .flat_map(|c| c.residues.iter())
            .collect()
    }

    /// Total residue count across the group's chains.
    pub fn residue_count(&self, structure: &Structure) -> usize {
        self.residues(structure).len()
    }

    /// Chain ids joined into a single label, e.g. "AB".
    pub fn label(&self) -> String {
        self.chains.concat()
    }
}

impl std::fmt::Display for ChainGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ala(number: isize) -> Residue {
        Residue {
            number,
            name: "ALA".to_string(),
            atoms: vec![Atom::new("CA", 0.0, 0.0, 0.0)],
        }
    }

    #[test]
    fn one_letter_codes() {
        assert_eq!(ala(1).one_letter(), Some('A'));
        let trp = Residue {
            number: 1,
            name: "TRP".to_string(),
            atoms: vec![],
        };
        assert_eq!(trp.one_letter(), Some('W'));
        let water = Residue {
            number: 1,
            name: "HOH".to_string(),
            atoms: vec![],
        };
        assert_eq!(water.one_letter(), None);
    }

    #[test]
    fn representative_atom_prefers_cb() {
        let mut res = ala(1);
        assert_eq!(res.representative_atom().unwrap().name, "CA");
        res.atoms.push(Atom::new("CB", 1.0, 0.0, 0.0));
        assert_eq!(res.representative_atom().unwrap().name, "CB");
    }

    #[test]
    fn chain_sequence_and_numbering() {
        let chain = Chain {
            id: "A".to_string(),
            residues: vec![ala(3), ala(4), ala(7)],
        };
        assert_eq!(chain.sequence(), "AAA");
        assert_eq!(chain.numbering(), vec![3, 4, 7]);
    }

    #[test]
    fn group_residues_follow_chain_order() {
        let structure = Structure {
            chains: vec![
                Chain {
                    id: "A".to_string(),
                    residues: vec![ala(1), ala(2)],
                },
                Chain {
                    id: "B".to_string(),
                    residues: vec![ala(10)],
                },
            ],
        };
        let group = ChainGroup::new(["B", "A"]);
        let numbers: Vec<isize> = group
            .residues(&structure)
            .iter()
            .map(|r| r.number)
            .collect();
        assert_eq!(numbers, vec![10, 1, 2]);
        assert_eq!(group.residue_count(&structure), 3);
        assert_eq!(group.label(), "BA");
    }

    #[test]
    fn retain_chains_drops_the_rest() {
        let mut structure = Structure {
            chains: vec![
                Chain {
                    id: "A".to_string(),
                    residues: vec![],
                },
                Chain {
                    id: "B".to_string(),
                    residues: vec![],
                },
                Chain {
                    id: "C".to_string(),
                    residues: vec![],
                },
            ],
        };
        structure.retain_chains(&["C".to_string(), "A".to_string()]);
        assert_eq!(structure.chain_ids(), vec!["A", "C"]);
    }
}
