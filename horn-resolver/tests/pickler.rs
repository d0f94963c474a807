//! A binary pickler written against the resolver: primitive rules,
//! structural `Pair`/`Choice` rules, and a record rule for a
//! self-referential list type.
use horn_resolver::{
    value, CatalogBuilder, Deferred, Resolver, RuleProvider, RuleSpec, TypeTerm, TypeVar, Value,
};
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq)]
enum Data {
    Unit,
    Int(i64),
    Pair(Box<Data>, Box<Data>),
    Left(Box<Data>),
    Right(Box<Data>),
}

type Writer = dyn Fn(&Data, &mut Vec<u8>) -> Result<(), String> + Send + Sync;
type Reader = dyn Fn(&mut &[u8]) -> Result<Data, String> + Send + Sync;

struct Pickler {
    write: Box<Writer>,
    read: Box<Reader>,
}

impl Pickler {
    fn pickle(&self, data: &Data) -> Result<Vec<u8>, String> {
        let mut out = Vec::new();
        (self.write)(data, &mut out)?;
        Ok(out)
    }

    fn unpickle(&self, mut bytes: &[u8]) -> Result<Data, String> {
        let data = (self.read)(&mut bytes)?;
        if !bytes.is_empty() {
            return Err(format!("{} trailing bytes", bytes.len()));
        }
        Ok(data)
    }
}

fn pickler<W, R>(write: W, read: R) -> Value
where
    W: Fn(&Data, &mut Vec<u8>) -> Result<(), String> + Send + Sync + 'static,
    R: Fn(&mut &[u8]) -> Result<Data, String> + Send + Sync + 'static,
{
    value(Pickler {
        write: Box::new(write),
        read: Box::new(read),
    })
}

/// Sub-picklers are only looked at while pickling, once every handle
/// is fulfilled.
fn ready(handle: &Deferred) -> Result<Arc<Pickler>, String> {
    handle
        .get_as::<Pickler>()
        .ok_or_else(|| format!("pickler for `{}` is not ready", handle.goal()))
}

fn take<'a>(bytes: &mut &'a [u8], count: usize) -> Result<&'a [u8], String> {
    if bytes.len() < count {
        return Err(format!("needed {} bytes, found {}", count, bytes.len()));
    }

    let (head, rest) = bytes.split_at(count);
    *bytes = rest;
    Ok(head)
}

fn unexpected(expected: &str, found: &Data) -> String {
    format!("expected {}, found {:?}", expected, found)
}

/// Primitive and structural rules.
struct Binary;

impl RuleProvider for Binary {
    fn provider_name(&self) -> &str {
        "binary"
    }

    fn rules(&self) -> Vec<RuleSpec> {
        let a = TypeVar::new("a");
        let b = TypeVar::new("b");

        let unit = RuleSpec::new("unit", TypeTerm::con("Unit"), |_| {
            Ok(pickler(
                |data, _| match data {
                    Data::Unit => Ok(()),
                    other => Err(unexpected("unit", other)),
                },
                |_| Ok(Data::Unit),
            ))
        });

        let int = RuleSpec::new("int", TypeTerm::con("Int"), |_| {
            Ok(pickler(
                |data, out| match data {
                    Data::Int(x) => {
                        out.extend_from_slice(&x.to_le_bytes());
                        Ok(())
                    }
                    other => Err(unexpected("int", other)),
                },
                |bytes| {
                    let mut raw = [0u8; 8];
                    raw.copy_from_slice(take(bytes, 8)?);
                    Ok(Data::Int(i64::from_le_bytes(raw)))
                },
            ))
        });

        let pair = RuleSpec::new(
            "pair",
            TypeTerm::app("Pair", vec![a.term(), b.term()]),
            |inputs| {
                let (first, second) = (inputs.deferred(0)?, inputs.deferred(1)?);
                let (read_first, read_second) = (first.clone(), second.clone());
                Ok(pickler(
                    move |data, out| match data {
                        Data::Pair(x, y) => {
                            (ready(&first)?.write)(x, out)?;
                            (ready(&second)?.write)(y, out)
                        }
                        other => Err(unexpected("pair", other)),
                    },
                    move |bytes| {
                        let x = (ready(&read_first)?.read)(bytes)?;
                        let y = (ready(&read_second)?.read)(bytes)?;
                        Ok(Data::Pair(Box::new(x), Box::new(y)))
                    },
                ))
            },
        )
        .requires_deferred(a.term())
        .requires_deferred(b.term());

        let choice = RuleSpec::new(
            "choice",
            TypeTerm::app("Choice", vec![a.term(), b.term()]),
            |inputs| {
                let (left, right) = (inputs.deferred(0)?, inputs.deferred(1)?);
                let (read_left, read_right) = (left.clone(), right.clone());
                Ok(pickler(
                    move |data, out| match data {
                        Data::Left(x) => {
                            out.push(0);
                            (ready(&left)?.write)(x, out)
                        }
                        Data::Right(y) => {
                            out.push(1);
                            (ready(&right)?.write)(y, out)
                        }
                        other => Err(unexpected("choice", other)),
                    },
                    move |bytes| match take(bytes, 1)?[0] {
                        0 => Ok(Data::Left(Box::new((ready(&read_left)?.read)(bytes)?))),
                        1 => Ok(Data::Right(Box::new((ready(&read_right)?.read)(bytes)?))),
                        tag => Err(format!("bad choice tag {}", tag)),
                    },
                ))
            },
        )
        .requires_deferred(a.term())
        .requires_deferred(b.term());

        vec![unit, int, pair, choice]
    }
}

/// `IntList` is encoded as `Choice<Unit, Pair<Int, IntList>>`.
fn int_list_encoding() -> TypeTerm {
    TypeTerm::app(
        "Choice",
        vec![
            TypeTerm::con("Unit"),
            TypeTerm::app("Pair", vec![TypeTerm::con("Int"), TypeTerm::con("IntList")]),
        ],
    )
}

struct Records;

impl RuleProvider for Records {
    fn provider_name(&self) -> &str {
        "records"
    }

    fn rules(&self) -> Vec<RuleSpec> {
        let int_list = RuleSpec::new("int_list", TypeTerm::con("IntList"), |inputs| {
            let encoding = inputs.deferred(0)?;
            let read_encoding = encoding.clone();
            Ok(pickler(
                move |data, out| (ready(&encoding)?.write)(data, out),
                move |bytes| (ready(&read_encoding)?.read)(bytes),
            ))
        })
        .requires_deferred(int_list_encoding());

        vec![int_list]
    }
}

fn resolver() -> Resolver {
    let catalog = CatalogBuilder::new()
        .provider(&Binary)
        .provider(&Records)
        .build()
        .expect("ok");
    Resolver::new(Arc::new(catalog))
}

fn int_list(items: &[i64]) -> Data {
    items.iter().rev().fold(Data::Left(Box::new(Data::Unit)), |tail, x| {
        Data::Right(Box::new(Data::Pair(Box::new(Data::Int(*x)), Box::new(tail))))
    })
}

#[test]
fn test_recursive_list_round_trip() {
    let resolver = resolver();
    let pickler = resolver
        .resolve_as::<Pickler>(&TypeTerm::con("IntList"))
        .expect("ok");

    let data = int_list(&[1, -2, 3]);
    let bytes = pickler.pickle(&data).expect("ok");
    assert_eq!(bytes.len(), 3 * (1 + 8) + 1);
    assert_eq!(bytes[0], 1);
    assert_eq!(&bytes[1..9], &1i64.to_le_bytes());
    assert_eq!(bytes[bytes.len() - 1], 0);

    assert_eq!(pickler.unpickle(&bytes).expect("ok"), data);
    assert!(pickler.unpickle(&bytes[..bytes.len() - 1]).is_err());
}

#[test]
fn test_encoding_resolved_with_record() {
    let resolver = resolver();
    let factory = resolver.compile(&TypeTerm::con("IntList")).expect("ok");

    assert!(factory.is_recursive());
    let explained = factory.explain();
    assert!(explained.starts_with("IntList <= records::int_list\n"));
    assert!(explained.contains("~IntList <= (back reference)"));

    // The structural goals inside the cycle were settled with it.
    assert!(resolver.status(&int_list_encoding()).is_resolved());
    let encoding = resolver
        .resolve_as::<Pickler>(&int_list_encoding())
        .expect("ok");
    assert_eq!(encoding.pickle(&int_list(&[])).expect("ok"), vec![0]);
}

#[test]
fn test_shape_mismatch() {
    let resolver = resolver();
    let pair = resolver
        .resolve_as::<Pickler>(&TypeTerm::app(
            "Pair",
            vec![TypeTerm::con("Int"), TypeTerm::con("Unit")],
        ))
        .expect("ok");

    let good = Data::Pair(Box::new(Data::Int(7)), Box::new(Data::Unit));
    assert_eq!(pair.pickle(&good).expect("ok").len(), 8);
    assert!(pair.pickle(&Data::Int(7)).is_err());
}

#[test]
fn test_missing_component_rule() {
    let resolver = resolver();
    let goal = TypeTerm::app("Pair", vec![TypeTerm::con("Int"), TypeTerm::con("Float")]);

    let error = resolver.compile(&goal).expect_err("no Float pickler");
    assert_eq!(error.kind(), "no-rule");
    let rendered = error.report().render();
    assert!(rendered.contains("tried binary::pair: requirement 1 (`Float`) failed"));
    assert!(rendered.contains("no rule resolves `Float`"));
}
