//! Straight line SPIR-V interpreter for the image loading kernels.
//!
//! Parses the serialized module back and evaluates the entry point once per coordinate, with a
//! nearest neighbour image bound at the sampler slot.

#![allow(dead_code)]

use hashbrown::HashMap;

use rspirv::{
    dr::{load_words, Instruction, Module, Operand},
    spirv::{BuiltIn, Decoration, Op, Word},
};

/// `Floor` in GLSL.std.450.
const GLSL_FLOOR: u32 = 8;

/// A texel grid sampled with unnormalized coordinates, nearest filtering and clamp to edge.
#[derive(Debug, Clone)]
pub struct MockImage {
    pub width: usize,
    pub height: usize,
    pub texels: Vec<[f64; 4]>,
}

impl MockImage {
    pub fn from_fn(width: usize, height: usize, f: impl Fn(usize, usize) -> [f64; 4]) -> Self {
        let mut texels = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                texels.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            texels,
        }
    }

    /// Single channel frame, ex: a Bayer mosaic.
    pub fn mosaic(width: usize, height: usize, f: impl Fn(usize, usize) -> f64) -> Self {
        Self::from_fn(width, height, |x, y| [f(x, y), 0.0, 0.0, 1.0])
    }

    pub fn texel(&self, x: usize, y: usize) -> [f64; 4] {
        self.texels[y * self.width + x]
    }

    pub fn sample(&self, x: f64, y: f64) -> [f64; 4] {
        let clamp = |v: f64, n: usize| (v.floor().max(0.0) as usize).min(n - 1);
        self.texel(clamp(x, self.width), clamp(y, self.height))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Val {
    Float(Vec<f64>),
    UInt(Vec<u32>),
    Bool(Vec<bool>),
    Pointer(Word, Vec<u32>),
    Image,
    Sampler,
    SampledImage,
}

impl Val {
    fn floats(&self) -> &[f64] {
        match self {
            Val::Float(values) => values,
            other => panic!("expected floats, got {other:?}"),
        }
    }

    fn components(&self) -> Vec<Val> {
        match self {
            Val::Float(values) => values.iter().map(|v| Val::Float(vec![*v])).collect(),
            Val::UInt(values) => values.iter().map(|v| Val::UInt(vec![*v])).collect(),
            Val::Bool(values) => values.iter().map(|v| Val::Bool(vec![*v])).collect(),
            other => panic!("{other:?} has no components"),
        }
    }

    fn concat(parts: Vec<Val>) -> Val {
        match parts.first() {
            Some(Val::Float(_)) => {
                Val::Float(parts.iter().flat_map(|p| p.floats().to_vec()).collect())
            }
            Some(Val::UInt(_)) => Val::UInt(
                parts
                    .iter()
                    .flat_map(|p| match p {
                        Val::UInt(v) => v.clone(),
                        other => panic!("mixed components {other:?}"),
                    })
                    .collect(),
            ),
            Some(Val::Bool(_)) => Val::Bool(
                parts
                    .iter()
                    .flat_map(|p| match p {
                        Val::Bool(v) => v.clone(),
                        other => panic!("mixed components {other:?}"),
                    })
                    .collect(),
            ),
            other => panic!("can't concatenate {other:?}"),
        }
    }
}

fn id(operand: &Operand) -> Word {
    match operand {
        Operand::IdRef(id) => *id,
        other => panic!("expected id, got {other:?}"),
    }
}

fn literal(operand: &Operand) -> u32 {
    match operand {
        Operand::LiteralBit32(value) => *value,
        other => panic!("expected literal, got {other:?}"),
    }
}

fn float_binary(lhs: &Val, rhs: &Val, op: impl Fn(f64, f64) -> f64) -> Val {
    let (lhs, rhs) = (lhs.floats(), rhs.floats());
    assert_eq!(lhs.len(), rhs.len(), "operand widths differ");
    Val::Float(lhs.iter().zip(rhs).map(|(a, b)| op(*a, *b)).collect())
}

/// Resources bound to one dispatch.
pub struct Dispatch<'a> {
    pub image: &'a MockImage,
    pub coordinates: &'a [[f64; 2]],
}

pub struct Interpreter {
    module: Module,
    types: HashMap<Word, Instruction>,
    globals: HashMap<Word, Val>,
    bindings: HashMap<Word, u32>,
    builtins: HashMap<Word, BuiltIn>,
}

impl Interpreter {
    pub fn new(words: &[u32]) -> Self {
        let module = load_words(words).expect("module should parse");
        let mut types: HashMap<Word, Instruction> = HashMap::new();
        let mut globals: HashMap<Word, Val> = HashMap::new();
        let mut bindings = HashMap::new();
        let mut builtins = HashMap::new();

        for inst in &module.annotations {
            if inst.class.opcode != Op::Decorate {
                continue;
            }
            let target = id(&inst.operands[0]);
            match inst.operands[1] {
                Operand::Decoration(Decoration::Binding) => {
                    bindings.insert(target, literal(&inst.operands[2]));
                }
                Operand::Decoration(Decoration::BuiltIn) => {
                    if let Operand::BuiltIn(builtin) = inst.operands[2] {
                        builtins.insert(target, builtin);
                    }
                }
                _ => {}
            }
        }

        for inst in &module.types_global_values {
            let result = inst.result_id.expect("global without result");
            let value = match inst.class.opcode {
                Op::Constant => {
                    let ty: &Instruction = &types[&inst.result_type.unwrap()];
                    match (ty.class.opcode, &inst.operands[0]) {
                        (Op::TypeFloat, Operand::LiteralBit32(bits)) => {
                            Val::Float(vec![f32::from_bits(*bits) as f64])
                        }
                        (Op::TypeFloat, Operand::LiteralBit64(bits)) => {
                            Val::Float(vec![f64::from_bits(*bits)])
                        }
                        (Op::TypeInt, Operand::LiteralBit32(value)) => Val::UInt(vec![*value]),
                        other => panic!("unsupported constant {other:?}"),
                    }
                }
                Op::ConstantTrue => Val::Bool(vec![true]),
                Op::ConstantFalse => Val::Bool(vec![false]),
                Op::ConstantComposite => Val::concat(
                    inst.operands
                        .iter()
                        .map(|operand| globals[&id(operand)].clone())
                        .collect(),
                ),
                Op::Variable => Val::Pointer(result, vec![]),
                _ => {
                    types.insert(result, inst.clone());
                    continue;
                }
            };
            globals.insert(result, value);
        }

        Self {
            module,
            types,
            globals,
            bindings,
            builtins,
        }
    }

    /// Run `entry_point` once per coordinate, returning the network buffer.
    pub fn dispatch(&self, entry_point: &str, dispatch: &Dispatch) -> Vec<[f64; 4]> {
        let entry = self
            .module
            .entry_points
            .iter()
            .find(|inst| matches!(&inst.operands[2], Operand::LiteralString(name) if name == entry_point))
            .unwrap_or_else(|| panic!("no entry point {entry_point}"));
        let function = id(&entry.operands[1]);

        let mut output = vec![[f64::NAN; 4]; dispatch.coordinates.len()];
        for index in 0..dispatch.coordinates.len() {
            let mut invocation = Invocation {
                interpreter: self,
                dispatch,
                index: index as u32,
                output: &mut output,
            };
            invocation.call(function, vec![]);
        }
        output
    }
}

struct Invocation<'a> {
    interpreter: &'a Interpreter,
    dispatch: &'a Dispatch<'a>,
    index: u32,
    output: &'a mut Vec<[f64; 4]>,
}

impl Invocation<'_> {
    fn load(&self, variable: Word, path: &[u32]) -> Val {
        if let Some(BuiltIn::GlobalInvocationId) = self.interpreter.builtins.get(&variable) {
            let id = vec![self.index, 0, 0];
            return match path {
                [] => Val::UInt(id),
                [component] => Val::UInt(vec![id[*component as usize]]),
                other => panic!("bad invocation id path {other:?}"),
            };
        }
        match (self.interpreter.bindings.get(&variable), path) {
            (Some(0), []) => Val::Sampler,
            (Some(1), []) => Val::Image,
            (Some(2), [0, index]) => Val::Float(self.dispatch.coordinates[*index as usize].to_vec()),
            other => panic!("unsupported load {other:?}"),
        }
    }

    fn store(&mut self, variable: Word, path: &[u32], value: Val) {
        match (self.interpreter.bindings.get(&variable), path) {
            (Some(3), [0, index]) => {
                let values = value.floats();
                self.output[*index as usize] = [values[0], values[1], values[2], values[3]];
            }
            other => panic!("unsupported store {other:?}"),
        }
    }

    fn call(&mut self, function: Word, args: Vec<Val>) -> Option<Val> {
        let interpreter = self.interpreter;
        let function = interpreter
            .module
            .functions
            .iter()
            .find(|f| f.def.as_ref().and_then(|def| def.result_id) == Some(function))
            .unwrap_or_else(|| panic!("no function %{function}"));

        let mut locals: HashMap<Word, Val> = HashMap::new();
        assert_eq!(function.parameters.len(), args.len(), "argument count");
        for (param, arg) in function.parameters.iter().zip(args) {
            locals.insert(param.result_id.unwrap(), arg);
        }
        assert_eq!(function.blocks.len(), 1, "kernels are straight line code");

        let globals = &interpreter.globals;
        let value = |locals: &HashMap<Word, Val>, operand: &Operand| -> Val {
            let id = id(operand);
            locals
                .get(&id)
                .or_else(|| globals.get(&id))
                .unwrap_or_else(|| panic!("%{id} is not defined"))
                .clone()
        };

        for inst in &function.blocks[0].instructions {
            let ops = &inst.operands;
            let result = match inst.class.opcode {
                Op::Return => return None,
                Op::ReturnValue => return Some(value(&locals, &ops[0])),
                Op::Store => {
                    let Val::Pointer(variable, path) = value(&locals, &ops[0]) else {
                        panic!("store through a non pointer");
                    };
                    let stored = value(&locals, &ops[1]);
                    self.store(variable, &path, stored);
                    continue;
                }
                Op::Load => {
                    let Val::Pointer(variable, path) = value(&locals, &ops[0]) else {
                        panic!("load through a non pointer");
                    };
                    self.load(variable, &path)
                }
                Op::AccessChain => {
                    let Val::Pointer(variable, mut path) = value(&locals, &ops[0]) else {
                        panic!("access chain on a non pointer");
                    };
                    for index in &ops[1..] {
                        match value(&locals, index) {
                            Val::UInt(v) => path.push(v[0]),
                            other => panic!("bad index {other:?}"),
                        }
                    }
                    Val::Pointer(variable, path)
                }
                Op::FunctionCall => {
                    let args = ops[1..].iter().map(|op| value(&locals, op)).collect();
                    self.call(id(&ops[0]), args).expect("call without result")
                }
                Op::CompositeConstruct => {
                    Val::concat(ops.iter().map(|op| value(&locals, op)).collect())
                }
                Op::CompositeExtract => {
                    value(&locals, &ops[0]).components()[literal(&ops[1]) as usize].clone()
                }
                Op::VectorShuffle => {
                    let mut all = value(&locals, &ops[0]).components();
                    all.extend(value(&locals, &ops[1]).components());
                    Val::concat(
                        ops[2..]
                            .iter()
                            .map(|index| all[literal(index) as usize].clone())
                            .collect(),
                    )
                }
                Op::FAdd => float_binary(&value(&locals, &ops[0]), &value(&locals, &ops[1]), |a, b| a + b),
                Op::FSub => float_binary(&value(&locals, &ops[0]), &value(&locals, &ops[1]), |a, b| a - b),
                Op::FMul => float_binary(&value(&locals, &ops[0]), &value(&locals, &ops[1]), |a, b| a * b),
                Op::FMod => float_binary(&value(&locals, &ops[0]), &value(&locals, &ops[1]), |a, b| {
                    a - b * (a / b).floor()
                }),
                Op::VectorTimesScalar => {
                    let scalar = value(&locals, &ops[1]).floats()[0];
                    Val::Float(value(&locals, &ops[0]).floats().iter().map(|v| v * scalar).collect())
                }
                Op::Dot => {
                    let lhs = value(&locals, &ops[0]);
                    let rhs = value(&locals, &ops[1]);
                    Val::Float(vec![lhs.floats().iter().zip(rhs.floats()).map(|(a, b)| a * b).sum()])
                }
                Op::ExtInst => {
                    assert_eq!(ops[1], Operand::LiteralExtInstInteger(GLSL_FLOOR));
                    Val::Float(value(&locals, &ops[2]).floats().iter().map(|v| v.floor()).collect())
                }
                Op::FOrdEqual => {
                    let lhs = value(&locals, &ops[0]);
                    let rhs = value(&locals, &ops[1]);
                    Val::Bool(lhs.floats().iter().zip(rhs.floats()).map(|(a, b)| a == b).collect())
                }
                Op::Select => {
                    let Val::Bool(condition) = value(&locals, &ops[0]) else {
                        panic!("select on a non bool condition");
                    };
                    let accept = value(&locals, &ops[1]).components();
                    let reject = value(&locals, &ops[2]).components();
                    assert_eq!(condition.len(), accept.len(), "select condition width");
                    Val::concat(
                        condition
                            .iter()
                            .zip(accept.into_iter().zip(reject))
                            .map(|(c, (a, r))| if *c { a } else { r })
                            .collect(),
                    )
                }
                Op::SampledImage => {
                    assert_eq!(value(&locals, &ops[0]), Val::Image);
                    assert_eq!(value(&locals, &ops[1]), Val::Sampler);
                    Val::SampledImage
                }
                Op::ImageSampleExplicitLod => {
                    assert_eq!(value(&locals, &ops[0]), Val::SampledImage);
                    let coord = value(&locals, &ops[1]);
                    let coord = coord.floats();
                    assert_eq!(value(&locals, &ops[3]), Val::Float(vec![0.0]), "lod");
                    Val::Float(self.dispatch.image.sample(coord[0], coord[1]).to_vec())
                }
                other => panic!("unsupported instruction {other:?}"),
            };
            locals.insert(inst.result_id.expect("instruction without result"), result);
        }
        panic!("function without return")
    }
}
