mod handled;
