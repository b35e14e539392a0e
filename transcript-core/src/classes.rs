// transcript-core - Built-in class registry for TranScript
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! The built-in classes and canonical singletons.
//!
//! Class structure (names, ancestry, flags, companions) is created once per
//! thread; every interpreter on the thread shares it, re-installing the
//! slot tables into its own accessor namespace. Slot declarations live in
//! `primitives`, not here, to keep bootstrap free of re-entrancy.

use std::rc::Rc;

use crate::class::{Class, FINAL, PRIMITIVE};
use crate::value::{Payload, Value};

/// Handles to every built-in class plus the canonical singletons.
pub struct Classes {
    pub object: Rc<Class>,
    pub class: Rc<Class>,
    pub function: Rc<Class>,
    pub accessor: Rc<Class>,
    pub boolean: Rc<Class>,
    pub true_class: Rc<Class>,
    pub false_class: Rc<Class>,
    pub nil_class: Rc<Class>,
    pub number: Rc<Class>,
    pub int: Rc<Class>,
    pub float: Rc<Class>,
    pub collection: Rc<Class>,
    pub sequence: Rc<Class>,
    pub iterator: Rc<Class>,
    pub sequence_iterator: Rc<Class>,
    pub string: Rc<Class>,
    pub array: Rc<Class>,
    pub hash: Rc<Class>,
    pub buffer: Rc<Class>,
    pub pair: Rc<Class>,
    pub error: Rc<Class>,
    pub package: Rc<Class>,
    pub box_: Rc<Class>,
    pub undefined: Rc<Class>,
    pub skeleton: Rc<Class>,

    pub nil_value: Value,
    pub true_value: Value,
    pub false_value: Value,
    /// Sentinel returned by exhausted iterators.
    pub done: Value,
}

thread_local! {
    static CLASSES: Classes = Classes::bootstrap();
}

/// Run a closure against the thread's built-in class registry.
pub fn with_classes<T>(f: impl FnOnce(&Classes) -> T) -> T {
    CLASSES.with(|c| f(c))
}

impl Classes {
    fn bootstrap() -> Classes {
        let object = Class::bare("Object", None, 0);
        let class = Class::bare("Class", Some(object.clone()), FINAL | PRIMITIVE);
        let function = Class::bare("Function", Some(object.clone()), FINAL | PRIMITIVE);
        let accessor = Class::bare("Accessor", Some(object.clone()), PRIMITIVE);
        let boolean = Class::bare("Boolean", Some(object.clone()), FINAL | PRIMITIVE);
        let true_class = Class::bare("", Some(boolean.clone()), FINAL | PRIMITIVE);
        let false_class = Class::bare("", Some(boolean.clone()), FINAL | PRIMITIVE);
        let nil_class = Class::bare("Nil", Some(object.clone()), FINAL | PRIMITIVE);
        let number = Class::bare("Number", Some(object.clone()), FINAL | PRIMITIVE);
        let int = Class::bare("Integer", Some(number.clone()), FINAL | PRIMITIVE);
        let float = Class::bare("Float", Some(number.clone()), FINAL | PRIMITIVE);
        let collection = Class::bare("Collection", Some(object.clone()), PRIMITIVE);
        let sequence = Class::bare("Sequence", Some(collection.clone()), PRIMITIVE);
        let iterator = Class::bare("Iterator", Some(object.clone()), PRIMITIVE);
        let sequence_iterator = Class::bare("", Some(iterator.clone()), 0);
        let string = Class::bare("String", Some(sequence.clone()), FINAL | PRIMITIVE);
        let array = Class::bare("Array", Some(sequence.clone()), FINAL);
        let hash = Class::bare("Hash", Some(collection.clone()), FINAL);
        let buffer = Class::bare("Buffer", Some(sequence.clone()), FINAL);
        let pair = Class::bare("Pair", Some(object.clone()), FINAL);
        let error = Class::bare("Error", Some(object.clone()), 0);
        let package = Class::bare("Package", Some(object.clone()), 0);
        let box_ = Class::bare("Box", Some(object.clone()), FINAL | PRIMITIVE);
        let undefined = Class::bare("Undefined", Some(object.clone()), FINAL | PRIMITIVE);
        let skeleton = Class::bare("Skeleton", Some(object.clone()), FINAL | PRIMITIVE);

        let nil_value = Value::raw(nil_class.clone(), Payload::None, vec![]);
        let true_value = Value::raw(true_class.clone(), Payload::None, vec![]);
        let false_value = Value::raw(false_class.clone(), Payload::None, vec![]);
        let done = Value::raw(object.clone(), Payload::None, vec![]);

        let all = [
            &object, &class, &function, &accessor, &boolean, &true_class, &false_class,
            &nil_class, &number, &int, &float, &collection, &sequence, &iterator,
            &sequence_iterator, &string, &array, &hash, &buffer, &pair, &error, &package,
            &box_, &undefined, &skeleton,
        ];
        for c in all {
            let companion = Value::raw(
                class.clone(),
                Payload::Class((*c).clone()),
                vec![false_value.clone()],
            );
            c.set_companion(companion);
        }

        Classes {
            object,
            class,
            function,
            accessor,
            boolean,
            true_class,
            false_class,
            nil_class,
            number,
            int,
            float,
            collection,
            sequence,
            iterator,
            sequence_iterator,
            string,
            array,
            hash,
            buffer,
            pair,
            error,
            package,
            box_,
            undefined,
            skeleton,
            nil_value,
            true_value,
            false_value,
            done,
        }
    }
}
