//! Textual and Graphviz output plus the human-readable statistics string.

use std::fmt::Write as _;
use std::io::{self, Write};

use crate::bdd::{Bdd, BddNode};
use crate::cache::BddCache;

impl Bdd {
    fn collect_nodes(&self, roots: &[&BddNode]) -> io::Result<Vec<(usize, usize, usize, usize)>> {
        let mut nodes = Vec::new();
        self.all_nodes(
            |id, level, low, high| {
                nodes.push((id, level, low, high));
                Ok(())
            },
            roots,
        )
        .map_err(io::Error::other)?;
        Ok(nodes)
    }

    /// Writes a textual listing of the nodes reachable from `roots` (or of
    /// the whole engine if `roots` is empty), one line per internal node:
    /// the node id, its variable in brackets, and the ids of the false and
    /// true branches.
    pub fn print<W: Write>(&self, writer: &mut W, roots: &[&BddNode]) -> io::Result<()> {
        if let Some(message) = self.error() {
            return writeln!(writer, "Error: {message}");
        }
        if let [root] = roots {
            if root.id() == 0 {
                return writeln!(writer, "False");
            }
            if root.id() == 1 {
                return writeln!(writer, "True");
            }
        }
        for (id, level, low, high) in self.collect_nodes(roots)? {
            if id > 1 {
                writeln!(writer, "{id}\t[{level}\t] ? \t{low}\t : {high}")?;
            }
        }
        Ok(())
    }

    /// Writes the nodes reachable from `roots` (or the whole engine if
    /// `roots` is empty) as a Graphviz digraph.  Each internal node shows
    /// its variable above its id, low edges are dotted, and edges into the
    /// false sink are omitted.
    pub fn dot<W: Write>(&self, writer: &mut W, roots: &[&BddNode]) -> io::Result<()> {
        writeln!(writer, "digraph G {{")?;
        writeln!(writer, "1 [shape=box, label=\"1\", style=filled, height=0.3, width=0.3];")?;
        for (id, level, low, high) in self.collect_nodes(roots)? {
            if id > 1 {
                writeln!(
                    writer,
                    "{id} [label=<\n\t<FONT POINT-SIZE=\"20\">{level}</FONT>\n\t<FONT POINT-SIZE=\"10\">[{id}]</FONT>\n>];"
                )?;
                if low != 0 {
                    writeln!(writer, "{id} -> {low} [style=dotted];")?;
                }
                if high != 0 {
                    writeln!(writer, "{id} -> {high} [style=filled];")?;
                }
            }
        }
        writeln!(writer, "}}")
    }

    /// A human-readable summary of the node table, the collector and the
    /// operation caches.
    pub fn stats(&self) -> String {
        let k = self.kernel().borrow();
        let statistics = k.statistics();
        let free_ratio = statistics.freenum as f64 / statistics.nodesize as f64 * 100.0;
        let mut res = String::new();
        let _ = writeln!(res, "Varnum:     {}", statistics.varnum);
        let _ = writeln!(res, "Allocated:  {}", statistics.nodesize);
        let _ = writeln!(res, "Produced:   {}", statistics.produced);
        let _ = writeln!(res, "Free:       {}  ({free_ratio:.1} %)", statistics.freenum);
        let _ = writeln!(res, "Used:       {}  ({:.1} %)", statistics.nodesize - statistics.freenum, 100.0 - free_ratio);
        let _ = writeln!(res, "==============");
        let _ = writeln!(res, "# of GC:    {}", statistics.gbcollectnum);
        let _ = writeln!(res, "==============");
        cache_line(&mut res, "Apply", &k.applycache);
        cache_line(&mut res, "ITE", &k.itecache);
        cache_line(&mut res, "Quant", &k.quantcache);
        cache_line(&mut res, "AppEx", &k.appexcache);
        cache_line(&mut res, "Replace", &k.replacecache);
        res
    }
}

fn cache_line(res: &mut String, name: &str, cache: &BddCache) {
    let _ = writeln!(res, "{name} cache: {} entries, {} hits, {} misses", cache.len(), cache.hits(), cache.misses());
}

#[cfg(test)]
mod tests {
    use crate::Bdd;

    #[test]
    fn test_print_constants() {
        let bdd = Bdd::new(2).unwrap();
        let mut out = Vec::new();
        bdd.print(&mut out, &[&bdd.verum()]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "True\n");
        let mut out = Vec::new();
        bdd.print(&mut out, &[&bdd.falsum()]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "False\n");
    }

    #[test]
    fn test_print_literal() {
        let bdd = Bdd::new(2).unwrap();
        let a = bdd.ithvar(1).unwrap();
        let mut out = Vec::new();
        bdd.print(&mut out, &[&a]).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, format!("{}\t[1\t] ? \t0\t : 1\n", a.id()));
    }

    #[test]
    fn test_dot_output() {
        let bdd = Bdd::new(2).unwrap();
        let a = bdd.ithvar(0).unwrap();
        let b = bdd.ithvar(1).unwrap();
        let ab = bdd.and(&[&a, &b]).unwrap();
        let mut out = Vec::new();
        bdd.dot(&mut out, &[&ab]).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("digraph G {"));
        assert!(text.ends_with("}\n"));
        // the true sink is a filled box, edges into the false sink are omitted
        assert!(text.contains("1 [shape=box"));
        assert!(!text.contains("-> 0"));
        // two internal nodes, each with only its true edge drawn
        assert_eq!(text.matches("[style=dotted]").count(), 0);
        assert_eq!(text.matches("[style=filled];").count(), 2);
    }

    #[test]
    fn test_stats_mentions_the_caches() {
        let bdd = Bdd::new(2).unwrap();
        let text = bdd.stats();
        assert!(text.contains("Varnum:     2"));
        for name in ["Apply", "ITE", "Quant", "AppEx", "Replace"] {
            assert!(text.contains(&format!("{name} cache")));
        }
    }
}
