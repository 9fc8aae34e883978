//! Minimal class-file assembler for tests. Emits just enough of the format
//! to exercise the parser: constant pool, annotated members and small
//! method bodies with invoke instructions.

pub struct ClassAsm {
    cp: Vec<u8>,
    cp_count: u16,
    access_flags: u16,
    this_index: u16,
    super_index: u16,
    fields: Vec<Vec<u8>>,
    methods: Vec<Vec<u8>>,
    class_attrs: Vec<Vec<u8>>,
}

impl ClassAsm {
    pub fn new(internal_name: &str) -> Self {
        let mut asm = Self {
            cp: Vec::new(),
            cp_count: 0,
            access_flags: 0x0021, // public super
            this_index: 0,
            super_index: 0,
            fields: Vec::new(),
            methods: Vec::new(),
            class_attrs: Vec::new(),
        };
        asm.this_index = asm.class_const(internal_name);
        asm.super_index = asm.class_const("java/lang/Object");
        asm
    }

    pub fn utf8(&mut self, s: &str) -> u16 {
        self.cp.push(1);
        self.cp.extend_from_slice(&(s.len() as u16).to_be_bytes());
        self.cp.extend_from_slice(s.as_bytes());
        self.cp_count += 1;
        self.cp_count
    }

    pub fn class_const(&mut self, internal_name: &str) -> u16 {
        let name = self.utf8(internal_name);
        self.cp.push(7);
        self.cp.extend_from_slice(&name.to_be_bytes());
        self.cp_count += 1;
        self.cp_count
    }

    fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let n = self.utf8(name);
        let d = self.utf8(descriptor);
        self.cp.push(12);
        self.cp.extend_from_slice(&n.to_be_bytes());
        self.cp.extend_from_slice(&d.to_be_bytes());
        self.cp_count += 1;
        self.cp_count
    }

    pub fn method_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> u16 {
        let class = self.class_const(owner);
        let nat = self.name_and_type(name, descriptor);
        self.cp.push(10);
        self.cp.extend_from_slice(&class.to_be_bytes());
        self.cp.extend_from_slice(&nat.to_be_bytes());
        self.cp_count += 1;
        self.cp_count
    }

    fn marker_annotations_attr(&mut self, annotation_descriptors: &[&str]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&(annotation_descriptors.len() as u16).to_be_bytes());
        for desc in annotation_descriptors {
            let type_idx = self.utf8(desc);
            body.extend_from_slice(&type_idx.to_be_bytes());
            body.extend_from_slice(&0u16.to_be_bytes()); // no element pairs
        }
        self.attribute("RuntimeVisibleAnnotations", &body)
    }

    fn attribute(&mut self, name: &str, body: &[u8]) -> Vec<u8> {
        let name_idx = self.utf8(name);
        let mut out = Vec::new();
        out.extend_from_slice(&name_idx.to_be_bytes());
        out.extend_from_slice(&(body.len() as u32).to_be_bytes());
        out.extend_from_slice(body);
        out
    }

    /// Add a field carrying zero-member (marker) annotations.
    pub fn field(
        &mut self,
        access_flags: u16,
        name: &str,
        descriptor: &str,
        annotation_descriptors: &[&str],
    ) {
        let name_idx = self.utf8(name);
        let desc_idx = self.utf8(descriptor);
        let mut attrs = Vec::new();
        if !annotation_descriptors.is_empty() {
            attrs.push(self.marker_annotations_attr(annotation_descriptors));
        }

        let mut out = Vec::new();
        out.extend_from_slice(&access_flags.to_be_bytes());
        out.extend_from_slice(&name_idx.to_be_bytes());
        out.extend_from_slice(&desc_idx.to_be_bytes());
        out.extend_from_slice(&(attrs.len() as u16).to_be_bytes());
        for a in attrs {
            out.extend_from_slice(&a);
        }
        self.fields.push(out);
    }

    /// Add a class-level annotation with one string member.
    pub fn class_annotation_with_str(&mut self, type_descriptor: &str, member: &str, value: &str) {
        let type_idx = self.utf8(type_descriptor);
        let member_idx = self.utf8(member);
        let value_idx = self.utf8(value);

        let mut body = Vec::new();
        body.extend_from_slice(&1u16.to_be_bytes()); // one annotation
        body.extend_from_slice(&type_idx.to_be_bytes());
        body.extend_from_slice(&1u16.to_be_bytes()); // one pair
        body.extend_from_slice(&member_idx.to_be_bytes());
        body.push(b's');
        body.extend_from_slice(&value_idx.to_be_bytes());

        let attr = self.attribute("RuntimeVisibleAnnotations", &body);
        self.class_attrs.push(attr);
    }

    /// Add a method whose body invokes each given target once. With
    /// `looped` the body ends in a backward goto, putting every call
    /// inside a loop span.
    pub fn method_with_calls(
        &mut self,
        access_flags: u16,
        name: &str,
        descriptor: &str,
        calls: &[(&str, &str, &str)],
        looped: bool,
    ) {
        let refs: Vec<u16> = calls
            .iter()
            .map(|(owner, name, desc)| self.method_ref(owner, name, desc))
            .collect();

        let mut code = Vec::new();
        for r in &refs {
            code.push(0xb6); // invokevirtual
            code.extend_from_slice(&r.to_be_bytes());
        }
        if looped {
            let delta = -(code.len() as i16);
            code.push(0xa7); // goto back to offset 0
            code.extend_from_slice(&delta.to_be_bytes());
        }
        code.push(0xb1); // return

        let mut body = Vec::new();
        body.extend_from_slice(&2u16.to_be_bytes()); // max_stack
        body.extend_from_slice(&2u16.to_be_bytes()); // max_locals
        body.extend_from_slice(&(code.len() as u32).to_be_bytes());
        body.extend_from_slice(&code);
        body.extend_from_slice(&0u16.to_be_bytes()); // exception table
        body.extend_from_slice(&0u16.to_be_bytes()); // attributes

        let code_attr = self.attribute("Code", &body);
        let name_idx = self.utf8(name);
        let desc_idx = self.utf8(descriptor);

        let mut out = Vec::new();
        out.extend_from_slice(&access_flags.to_be_bytes());
        out.extend_from_slice(&name_idx.to_be_bytes());
        out.extend_from_slice(&desc_idx.to_be_bytes());
        out.extend_from_slice(&1u16.to_be_bytes());
        out.extend_from_slice(&code_attr);
        self.methods.push(out);
    }

    pub fn build(self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&0xCAFE_BABEu32.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes()); // minor
        out.extend_from_slice(&61u16.to_be_bytes()); // major (Java 17)
        out.extend_from_slice(&(self.cp_count + 1).to_be_bytes());
        out.extend_from_slice(&self.cp);
        out.extend_from_slice(&self.access_flags.to_be_bytes());
        out.extend_from_slice(&self.this_index.to_be_bytes());
        out.extend_from_slice(&self.super_index.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes()); // interfaces
        out.extend_from_slice(&(self.fields.len() as u16).to_be_bytes());
        for f in &self.fields {
            out.extend_from_slice(f);
        }
        out.extend_from_slice(&(self.methods.len() as u16).to_be_bytes());
        for m in &self.methods {
            out.extend_from_slice(m);
        }
        out.extend_from_slice(&(self.class_attrs.len() as u16).to_be_bytes());
        for a in &self.class_attrs {
            out.extend_from_slice(a);
        }
        out
    }
}
